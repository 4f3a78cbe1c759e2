use tutor_bot::bot::callback_data::CallbackAction;
use tutor_bot::database::models::{ContentType, TutorField};
use tutor_bot::services::roles::Role;

#[test]
fn test_known_encodings() {
    assert_eq!(CallbackAction::ChooseTutor(42).encode(), "tutor:42");
    assert_eq!(CallbackAction::ApproveRequest(7).encode(), "req_ok:7");
    assert_eq!(CallbackAction::HomeworkType(ContentType::Voice).encode(), "hw_type:voice");
    assert_eq!(CallbackAction::EditProfile(TutorField::Cost).encode(), "profile:cost");
    assert_eq!(CallbackAction::SetRole(Role::Admin).encode(), "role:admin");
    assert_eq!(CallbackAction::GenerateLessons.encode(), "tpl_generate");
    assert_eq!(CallbackAction::Cancel.encode(), "cancel");
}

#[test]
fn test_every_action_parses_back() {
    let actions = [
        CallbackAction::ChooseTutor(1),
        CallbackAction::ApproveRequest(2),
        CallbackAction::RejectRequest(3),
        CallbackAction::RefreshRequests,
        CallbackAction::HomeworkStudent(4),
        CallbackAction::HomeworkType(ContentType::Photo),
        CallbackAction::ViewHomework(5),
        CallbackAction::SubmitHomework(6),
        CallbackAction::SubmissionType(ContentType::File),
        CallbackAction::HomeworkChecked(7),
        CallbackAction::HomeworkReminder(8),
        CallbackAction::LessonStudent(9),
        CallbackAction::CompleteLesson(10),
        CallbackAction::CancelLesson(11),
        CallbackAction::RescheduleLesson(12),
        CallbackAction::TemplateStudent(13),
        CallbackAction::AddTemplate,
        CallbackAction::GenerateLessons,
        CallbackAction::AddSlot,
        CallbackAction::DeleteSlot(14),
        CallbackAction::AddVacation,
        CallbackAction::EditProfile(TutorField::Link),
        CallbackAction::MessageTutor(15),
        CallbackAction::SetRole(Role::Superadmin),
        CallbackAction::DeleteTutor(16),
        CallbackAction::ConfirmDeleteTutor(17),
        CallbackAction::Cancel,
    ];

    for action in actions {
        assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
    }
}

#[test]
fn test_malformed_data_is_ignored() {
    for data in [
        "",
        "tutor",
        "tutor:",
        "tutor:abc",
        "slot_add:5",
        "cancel:1",
        "hw_type:gif",
        "role:wizard",
        "profile:age",
        "unknown:1",
        "vote:yes:123",
    ] {
        assert_eq!(CallbackAction::parse(data), None, "data {data:?}");
    }
}

#[test]
fn test_encodings_fit_telegram_limit() {
    let widest = [
        CallbackAction::ConfirmDeleteTutor(i64::MAX),
        CallbackAction::LessonStudent(i64::MIN),
        CallbackAction::SetRole(Role::Unregistered),
    ];
    for action in widest {
        assert!(action.encode().len() <= 64, "{}", action.encode());
    }
}
