use crate::database::models::{ContentType, TutorField};
use crate::services::roles::Role;

/// Every inline button the bot sends, encoded as `prefix[:arg]`.
///
/// Telegram limits callback data to 64 bytes; the longest encoding here is
/// well under that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    ChooseTutor(i64),

    ApproveRequest(i64),
    RejectRequest(i64),
    RefreshRequests,

    HomeworkStudent(i64),
    HomeworkType(ContentType),
    ViewHomework(i64),
    SubmitHomework(i64),
    SubmissionType(ContentType),
    HomeworkChecked(i64),
    HomeworkReminder(i64),

    LessonStudent(i64),
    CompleteLesson(i64),
    CancelLesson(i64),
    RescheduleLesson(i64),
    TemplateStudent(i64),
    AddTemplate,
    GenerateLessons,

    AddSlot,
    DeleteSlot(i64),
    AddVacation,

    EditProfile(TutorField),
    MessageTutor(i64),

    SetRole(Role),
    DeleteTutor(i64),
    ConfirmDeleteTutor(i64),

    Cancel,
}

fn parse_id(arg: Option<&str>) -> Option<i64> {
    arg?.parse().ok()
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::ChooseTutor(id) => format!("tutor:{id}"),
            CallbackAction::ApproveRequest(id) => format!("req_ok:{id}"),
            CallbackAction::RejectRequest(id) => format!("req_no:{id}"),
            CallbackAction::RefreshRequests => "req_refresh".to_string(),
            CallbackAction::HomeworkStudent(id) => format!("hw_student:{id}"),
            CallbackAction::HomeworkType(t) => format!("hw_type:{}", t.as_str()),
            CallbackAction::ViewHomework(id) => format!("hw_view:{id}"),
            CallbackAction::SubmitHomework(id) => format!("hw_submit:{id}"),
            CallbackAction::SubmissionType(t) => format!("sub_type:{}", t.as_str()),
            CallbackAction::HomeworkChecked(id) => format!("hw_check:{id}"),
            CallbackAction::HomeworkReminder(id) => format!("hw_remind:{id}"),
            CallbackAction::LessonStudent(id) => format!("lesson_student:{id}"),
            CallbackAction::CompleteLesson(id) => format!("lesson_done:{id}"),
            CallbackAction::CancelLesson(id) => format!("lesson_cancel:{id}"),
            CallbackAction::RescheduleLesson(id) => format!("lesson_move:{id}"),
            CallbackAction::TemplateStudent(id) => format!("tpl_student:{id}"),
            CallbackAction::AddTemplate => "tpl_add".to_string(),
            CallbackAction::GenerateLessons => "tpl_generate".to_string(),
            CallbackAction::AddSlot => "slot_add".to_string(),
            CallbackAction::DeleteSlot(id) => format!("slot_del:{id}"),
            CallbackAction::AddVacation => "vac_add".to_string(),
            CallbackAction::EditProfile(field) => format!("profile:{}", field.as_str()),
            CallbackAction::MessageTutor(id) => format!("msg_tutor:{id}"),
            CallbackAction::SetRole(role) => format!("role:{}", role.as_str()),
            CallbackAction::DeleteTutor(id) => format!("tutor_del:{id}"),
            CallbackAction::ConfirmDeleteTutor(id) => format!("tutor_del_ok:{id}"),
            CallbackAction::Cancel => "cancel".to_string(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (prefix, arg) = match data.split_once(':') {
            Some((prefix, arg)) => (prefix, Some(arg)),
            None => (data, None),
        };

        let action = match prefix {
            "tutor" => CallbackAction::ChooseTutor(parse_id(arg)?),
            "req_ok" => CallbackAction::ApproveRequest(parse_id(arg)?),
            "req_no" => CallbackAction::RejectRequest(parse_id(arg)?),
            "req_refresh" => CallbackAction::RefreshRequests,
            "hw_student" => CallbackAction::HomeworkStudent(parse_id(arg)?),
            "hw_type" => CallbackAction::HomeworkType(ContentType::parse(arg?)?),
            "hw_view" => CallbackAction::ViewHomework(parse_id(arg)?),
            "hw_submit" => CallbackAction::SubmitHomework(parse_id(arg)?),
            "sub_type" => CallbackAction::SubmissionType(ContentType::parse(arg?)?),
            "hw_check" => CallbackAction::HomeworkChecked(parse_id(arg)?),
            "hw_remind" => CallbackAction::HomeworkReminder(parse_id(arg)?),
            "lesson_student" => CallbackAction::LessonStudent(parse_id(arg)?),
            "lesson_done" => CallbackAction::CompleteLesson(parse_id(arg)?),
            "lesson_cancel" => CallbackAction::CancelLesson(parse_id(arg)?),
            "lesson_move" => CallbackAction::RescheduleLesson(parse_id(arg)?),
            "tpl_student" => CallbackAction::TemplateStudent(parse_id(arg)?),
            "tpl_add" => CallbackAction::AddTemplate,
            "tpl_generate" => CallbackAction::GenerateLessons,
            "slot_add" => CallbackAction::AddSlot,
            "slot_del" => CallbackAction::DeleteSlot(parse_id(arg)?),
            "vac_add" => CallbackAction::AddVacation,
            "profile" => CallbackAction::EditProfile(TutorField::parse(arg?)?),
            "msg_tutor" => CallbackAction::MessageTutor(parse_id(arg)?),
            "role" => CallbackAction::SetRole(arg?.parse().ok()?),
            "tutor_del" => CallbackAction::DeleteTutor(parse_id(arg)?),
            "tutor_del_ok" => CallbackAction::ConfirmDeleteTutor(parse_id(arg)?),
            "cancel" => CallbackAction::Cancel,
            _ => return None,
        };

        // Arguments on argument-less actions mean the data is not ours.
        let takes_arg = action.encode().contains(':');
        if takes_arg != arg.is_some() {
            return None;
        }
        Some(action)
    }
}
