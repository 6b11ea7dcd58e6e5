use tokio::io::{AsyncBufReadExt, BufReader};

use quiz_core::model::{Direction, QuizSession};
use services::{AppServices, QuizEngine, QuizError, StartRequest};

use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerInput {
    /// 1-based choice index.
    Choose(usize),
    Move(Direction),
    Clear,
    Submit,
    Quit,
}

fn parse_input(line: &str) -> Option<PlayerInput> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "n" | "next" => Some(PlayerInput::Move(Direction::Next)),
        "p" | "prev" | "previous" => Some(PlayerInput::Move(Direction::Previous)),
        "c" | "clear" => Some(PlayerInput::Clear),
        "s" | "submit" => Some(PlayerInput::Submit),
        "q" | "quit" => Some(PlayerInput::Quit),
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(PlayerInput::Choose),
    }
}

/// Interactive loop over stdin. The deadline is checked before and after every input.
pub async fn run(services: &AppServices, request: StartRequest) -> Result<(), QuizError> {
    let engine = services.engine();
    let mut session = match engine.start(request).await {
        Ok(session) => session,
        Err(QuizError::NoQuestionsAvailable) => {
            println!("No questions match those filters.");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match poll_deadline(&engine, &mut session).await? {
            Deadline::Running => {}
            Deadline::Closed => return Ok(()),
            Deadline::Unsaved => {
                println!("Press Enter to retry saving.");
                if !matches!(lines.next_line().await, Ok(Some(_))) {
                    tracing::warn!(session_id = %session.id(), "input closed, expired result not saved");
                    return Ok(());
                }
                continue;
            }
        }
        render::question(&engine.snapshot(&session));

        let Ok(Some(line)) = lines.next_line().await else {
            tracing::info!(session_id = %session.id(), "input closed, quiz abandoned");
            return Ok(());
        };
        let Some(input) = parse_input(&line) else {
            println!("Unrecognized input: {}", line.trim());
            continue;
        };

        // A late answer must not count once the budget is spent.
        match poll_deadline(&engine, &mut session).await? {
            Deadline::Running => {}
            Deadline::Closed => return Ok(()),
            Deadline::Unsaved => continue,
        }

        match apply(&engine, &mut session, input).await {
            Ok(Step::Continue) => {}
            Ok(Step::Finished) => return Ok(()),
            Err(QuizError::Persistence(err)) => {
                println!("Could not save your result ({err}). Submit again to retry.");
            }
            Err(err) => println!("{err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    Running,
    Closed,
    /// Time ran out but the result could not be stored; the session is still open.
    Unsaved,
}

async fn poll_deadline(
    engine: &QuizEngine,
    session: &mut QuizSession,
) -> Result<Deadline, QuizError> {
    match engine.enforce_deadline(session).await {
        Ok(None) => Ok(Deadline::Running),
        Ok(Some(result)) => {
            println!("Time is up.");
            render::result(session, &result);
            Ok(Deadline::Closed)
        }
        Err(QuizError::Persistence(err)) => {
            println!("Time is up, but your result could not be saved ({err}).");
            Ok(Deadline::Unsaved)
        }
        Err(err) => Err(err),
    }
}

enum Step {
    Continue,
    Finished,
}

async fn apply(
    engine: &QuizEngine,
    session: &mut QuizSession,
    input: PlayerInput,
) -> Result<Step, QuizError> {
    match input {
        PlayerInput::Choose(n) => {
            let question = session.current_question();
            let question_id = question.id();
            let Some(choice) = question.choices().get(n - 1).cloned() else {
                println!("Pick a number between 1 and {}.", question.choices().len());
                return Ok(Step::Continue);
            };
            engine.record_answer(session, question_id, &choice)?;
        }
        PlayerInput::Move(direction) => {
            engine.advance(session, direction)?;
        }
        PlayerInput::Clear => engine.clear_answers(session)?,
        PlayerInput::Submit => {
            let result = engine.submit(session).await?;
            render::result(session, &result);
            return Ok(Step::Finished);
        }
        PlayerInput::Quit => {
            tracing::info!(session_id = %session.id(), "quiz abandoned");
            return Ok(Step::Finished);
        }
    }
    Ok(Step::Continue)
}
