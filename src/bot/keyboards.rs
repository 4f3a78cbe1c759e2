use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use super::callback_data::CallbackAction;
use crate::database::models::{ContentType, Tutor, User};
use crate::services::roles::Role;

/// Reply-keyboard buttons. Incoming text is matched back with
/// [`MenuButton::from_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    MyLessons,
    MyHomework,
    MyTutor,

    Profile,
    MyStudents,
    AssignHomework,
    Submissions,
    Schedule,
    AddLesson,
    WeeklySchedule,
    FreeSlots,
    Vacations,
    Requests,
    Statistics,

    AddTutor,
    RemoveTutor,
    ManageRoles,
    SystemStats,
    TutorList,

    Help,
    MainMenu,
    Cancel,
}

impl MenuButton {
    const ALL: [MenuButton; 22] = [
        MenuButton::MyLessons,
        MenuButton::MyHomework,
        MenuButton::MyTutor,
        MenuButton::Profile,
        MenuButton::MyStudents,
        MenuButton::AssignHomework,
        MenuButton::Submissions,
        MenuButton::Schedule,
        MenuButton::AddLesson,
        MenuButton::WeeklySchedule,
        MenuButton::FreeSlots,
        MenuButton::Vacations,
        MenuButton::Requests,
        MenuButton::Statistics,
        MenuButton::AddTutor,
        MenuButton::RemoveTutor,
        MenuButton::ManageRoles,
        MenuButton::SystemStats,
        MenuButton::TutorList,
        MenuButton::Help,
        MenuButton::MainMenu,
        MenuButton::Cancel,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuButton::MyLessons => "📅 My lessons",
            MenuButton::MyHomework => "📚 My homework",
            MenuButton::MyTutor => "👨‍🏫 My tutor",
            MenuButton::Profile => "👤 Profile",
            MenuButton::MyStudents => "👥 My students",
            MenuButton::AssignHomework => "📝 Assign homework",
            MenuButton::Submissions => "📤 Submissions",
            MenuButton::Schedule => "🗓 Schedule",
            MenuButton::AddLesson => "➕ Add lesson",
            MenuButton::WeeklySchedule => "🔁 Weekly schedule",
            MenuButton::FreeSlots => "🕒 Free slots",
            MenuButton::Vacations => "🏖 Vacations",
            MenuButton::Requests => "📥 Requests",
            MenuButton::Statistics => "📊 Statistics",
            MenuButton::AddTutor => "🧑‍🏫 Add tutor",
            MenuButton::RemoveTutor => "🗑 Remove tutor",
            MenuButton::ManageRoles => "🔑 Manage roles",
            MenuButton::SystemStats => "📈 System stats",
            MenuButton::TutorList => "📋 Tutor list",
            MenuButton::Help => "❓ Help",
            MenuButton::MainMenu => "🏠 Main menu",
            MenuButton::Cancel => "❌ Cancel",
        }
    }

    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|b| b.label() == text)
    }

    /// Tutor features need admin rights, superadmin features need more.
    pub fn required_role(&self) -> Role {
        match self {
            MenuButton::Profile
            | MenuButton::MyStudents
            | MenuButton::AssignHomework
            | MenuButton::Submissions
            | MenuButton::Schedule
            | MenuButton::AddLesson
            | MenuButton::WeeklySchedule
            | MenuButton::FreeSlots
            | MenuButton::Vacations
            | MenuButton::Requests
            | MenuButton::Statistics => Role::Admin,
            MenuButton::AddTutor
            | MenuButton::RemoveTutor
            | MenuButton::ManageRoles
            | MenuButton::SystemStats
            | MenuButton::TutorList => Role::Superadmin,
            _ => Role::Student,
        }
    }
}

fn rows(buttons: &[&[MenuButton]]) -> Vec<Vec<KeyboardButton>> {
    buttons
        .iter()
        .map(|row| row.iter().map(|b| KeyboardButton::new(b.label())).collect())
        .collect()
}

const STUDENT_ROWS: &[&[MenuButton]] = &[
    &[MenuButton::MyLessons, MenuButton::MyHomework],
    &[MenuButton::MyTutor, MenuButton::Help],
];

const TUTOR_ROWS: &[&[MenuButton]] = &[
    &[MenuButton::Schedule, MenuButton::AddLesson],
    &[MenuButton::AssignHomework, MenuButton::Submissions],
    &[MenuButton::MyStudents, MenuButton::Requests],
    &[MenuButton::WeeklySchedule, MenuButton::FreeSlots],
    &[MenuButton::Vacations, MenuButton::Profile],
    &[MenuButton::Statistics, MenuButton::Help],
];

const SUPERADMIN_ROWS: &[&[MenuButton]] = &[
    &[MenuButton::AddTutor, MenuButton::RemoveTutor],
    &[MenuButton::ManageRoles, MenuButton::TutorList],
    &[MenuButton::SystemStats],
];

pub fn main_menu(role: Role) -> KeyboardMarkup {
    let keyboard = match role {
        Role::Superadmin => {
            let mut all = rows(TUTOR_ROWS);
            all.extend(rows(SUPERADMIN_ROWS));
            all
        }
        Role::Admin => rows(TUTOR_ROWS),
        _ => rows(STUDENT_ROWS),
    };
    KeyboardMarkup::new(keyboard).resize_keyboard(true)
}

/// Shown while a multi-step flow is waiting for input.
pub fn cancel_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(rows(&[&[MenuButton::Cancel]])).resize_keyboard(true)
}

pub fn tutor_choice(tutors: &[Tutor]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(tutors.iter().map(|t| {
        let label = match &t.subjects {
            Some(subjects) if !subjects.is_empty() => format!("{} ({})", t.name, subjects),
            _ => t.name.clone(),
        };
        vec![InlineKeyboardButton::callback(
            label,
            CallbackAction::ChooseTutor(t.id).encode(),
        )]
    }))
}

/// One button per student; `action` builds the callback for each id.
pub fn student_choice(students: &[User], action: fn(i64) -> CallbackAction) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = students
        .iter()
        .map(|s| {
            vec![InlineKeyboardButton::callback(
                s.display_name(),
                action(s.id).encode(),
            )]
        })
        .collect();
    keyboard.push(vec![cancel_button()]);
    InlineKeyboardMarkup::new(keyboard)
}

pub fn content_type_choice(action: fn(ContentType) -> CallbackAction) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = ContentType::ALL
        .iter()
        .map(|t| InlineKeyboardButton::callback(t.label(), action(*t).encode()))
        .collect();
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> =
        buttons.chunks(3).map(<[InlineKeyboardButton]>::to_vec).collect();
    keyboard.push(vec![cancel_button()]);
    InlineKeyboardMarkup::new(keyboard)
}

pub fn role_choice() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback(Role::Student.label(), CallbackAction::SetRole(Role::Student).encode()),
            InlineKeyboardButton::callback(Role::Admin.label(), CallbackAction::SetRole(Role::Admin).encode()),
        ],
        vec![
            InlineKeyboardButton::callback(
                Role::Superadmin.label(),
                CallbackAction::SetRole(Role::Superadmin).encode(),
            ),
            InlineKeyboardButton::callback(Role::Archived.label(), CallbackAction::SetRole(Role::Archived).encode()),
        ],
        vec![cancel_button()],
    ])
}

pub fn cancel_button() -> InlineKeyboardButton {
    InlineKeyboardButton::callback("❌ Cancel", CallbackAction::Cancel.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_label_maps_back_to_its_button() {
        for button in MenuButton::ALL {
            assert_eq!(MenuButton::from_text(button.label()), Some(button));
        }
        assert_eq!(MenuButton::from_text("something else"), None);
    }

    #[test]
    fn menus_only_offer_permitted_buttons() {
        let labels = |role: Role| -> Vec<String> {
            main_menu(role)
                .keyboard
                .into_iter()
                .flatten()
                .map(|b| b.text)
                .collect()
        };
        assert!(labels(Role::Student)
            .iter()
            .all(|l| MenuButton::from_text(l).is_some_and(|b| b.required_role() == Role::Student)));
        assert!(labels(Role::Admin)
            .iter()
            .all(|l| MenuButton::from_text(l).is_some_and(|b| b.required_role() != Role::Superadmin)));
        assert!(labels(Role::Superadmin).contains(&MenuButton::SystemStats.label().to_string()));
    }
}
