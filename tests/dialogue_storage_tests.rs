mod common;

use anyhow::Result;
use common::setup_env;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::ChatId;
use teloxide::utils::command::BotCommands;
use tutor_bot::bot::commands::Command;
use tutor_bot::bot::dialogue::{BotDialogue, State};
use tutor_bot::bot::handlers::BotHandler;
use tutor_bot::database::models::ContentType;
use tutor_bot::services::registration::RegistrationState;

#[tokio::test]
async fn test_handler_schema_builds() -> Result<()> {
    let env = setup_env().await?;
    let handler = BotHandler::new(env.ctx.clone());
    let _schema = handler.schema();
    Ok(())
}

#[tokio::test]
async fn test_dialogue_state_is_kept_per_chat() -> Result<()> {
    let storage = InMemStorage::<State>::new();
    let first: BotDialogue = Dialogue::new(storage.clone(), ChatId(1));
    let second: BotDialogue = Dialogue::new(storage.clone(), ChatId(2));

    assert_eq!(first.get().await?, None);

    first
        .update(State::Registration(RegistrationState::AwaitingName { tutor_id: 9 }))
        .await?;
    second
        .update(State::AssignHomeworkContent {
            student_id: 5,
            content_type: ContentType::Photo,
        })
        .await?;

    assert_eq!(
        first.get().await?,
        Some(State::Registration(RegistrationState::AwaitingName { tutor_id: 9 }))
    );

    first.exit().await?;
    assert_eq!(first.get().await?, None);
    assert!(matches!(
        second.get().await?,
        Some(State::AssignHomeworkContent { student_id: 5, .. })
    ));
    Ok(())
}

#[test]
fn test_idle_is_the_default_state() {
    assert_eq!(State::default(), State::Idle);
    assert!(State::Idle.is_idle());
    assert!(!State::AddSlot.is_idle());
}

#[test]
fn test_commands_parse() {
    let cases = [
        ("/start", Command::Start),
        ("/help", Command::Help),
        ("/menu", Command::Menu),
        ("/cancel", Command::Cancel),
        ("/admin", Command::Admin),
        ("/superadmin", Command::Superadmin),
        ("/student", Command::Student),
        ("/start@tutorbot", Command::Start),
    ];
    for (input, expected) in cases {
        assert_eq!(Command::parse(input, "tutorbot").unwrap(), expected, "input {input}");
    }

    assert!(Command::parse("/schedule", "tutorbot").is_err());
    assert!(Command::parse("start", "tutorbot").is_err());
}

#[test]
fn test_command_descriptions_list_every_command() {
    let help = Command::descriptions().to_string();
    for command in ["/start", "/help", "/menu", "/cancel", "/admin", "/superadmin", "/student"] {
        assert!(help.contains(command), "{command} missing from help");
    }
}
