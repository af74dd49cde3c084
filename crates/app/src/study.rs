//! Terminal front end for a study session.

use std::io::Write;

use services::{ActiveSession, MemoryNotifier, NoticeLevel, SessionError, StudyLoopService};
use tellect_core::StudySessionError;
use tellect_core::model::{Subject, UserId};
use tellect_core::scoring;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// How a study run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyOutcome {
    NothingToStudy,
    Quit { answered: u32 },
    Completed { correct: u32, incorrect: u32 },
}

enum Verdict {
    Correct,
    Incorrect,
    Quit,
}

/// Drive one study session, reading commands from `input` and writing to `out`.
pub async fn run_study<R, W>(
    loop_svc: &StudyLoopService,
    notices: &MemoryNotifier,
    owner: UserId,
    subject: Option<Subject>,
    input: &mut Lines<R>,
    out: &mut W,
) -> AppResult<StudyOutcome>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = match loop_svc.start_session(owner, subject).await {
        Ok(session) => session,
        Err(SessionError::Session(StudySessionError::EmptySession)) => {
            writeln!(
                out,
                "Nothing to study yet. Add flashcards with `tellect add` or `tellect generate`."
            )?;
            return Ok(StudyOutcome::NothingToStudy);
        }
        Err(e) => return Err(e.into()),
    };

    while !session.is_complete() {
        let Some(item) = session.current_item() else {
            break;
        };
        writeln!(
            out,
            "\n[{}/{}] {} ({})",
            session.engine().position() + 1,
            session.engine().len(),
            item.subject(),
            item.difficulty()
        )?;
        writeln!(out, "Q: {}", item.prompt())?;
        write!(out, "Press Enter to reveal, q to quit: ")?;
        out.flush()?;

        let Some(line) = input.next_line().await? else {
            return Ok(quit(&session));
        };
        if line.trim().eq_ignore_ascii_case("q") {
            return Ok(quit(&session));
        }

        loop_svc.reveal(&mut session)?;
        if let Some(item) = session.current_item() {
            writeln!(out, "A: {}", item.response())?;
        }

        let verdict = read_verdict(input, out).await?;
        let is_correct = match verdict {
            Verdict::Correct => true,
            Verdict::Incorrect => false,
            Verdict::Quit => return Ok(quit(&session)),
        };

        let result = loop_svc.answer_current(&mut session, is_correct).await?;
        if is_correct {
            writeln!(out, "Correct! +{} XP", scoring::XP_PER_CORRECT_ANSWER)?;
        } else {
            writeln!(out, "Keep practicing.")?;
        }
        if result.failed_effects > 0 {
            log::debug!("{} effects failed for this answer", result.failed_effects);
        }
        print_notices(notices, out)?;
    }

    let tally = session.tally();
    writeln!(
        out,
        "\nSession complete: {} correct, {} incorrect, {}% accuracy, {} XP earned.",
        tally.correct,
        tally.incorrect,
        scoring::accuracy(tally.correct, tally.answered()),
        tally.xp_earned()
    )?;
    if session.persistence_failures() > 0 {
        writeln!(
            out,
            "Warning: {} updates could not be saved.",
            session.persistence_failures()
        )?;
    }

    Ok(StudyOutcome::Completed {
        correct: tally.correct,
        incorrect: tally.incorrect,
    })
}

async fn read_verdict<R, W>(input: &mut Lines<R>, out: &mut W) -> AppResult<Verdict>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(out, "Did you get it right? [y/n/q]: ")?;
        out.flush()?;
        let Some(line) = input.next_line().await? else {
            return Ok(Verdict::Quit);
        };
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(Verdict::Correct),
            "n" | "no" => return Ok(Verdict::Incorrect),
            "q" | "quit" => return Ok(Verdict::Quit),
            _ => writeln!(out, "Please answer y or n.")?,
        }
    }
}

fn quit(session: &ActiveSession) -> StudyOutcome {
    StudyOutcome::Quit {
        answered: session.tally().answered(),
    }
}

pub fn print_notices<W: Write>(notices: &MemoryNotifier, out: &mut W) -> std::io::Result<()> {
    for notice in notices.drain() {
        match notice.level {
            NoticeLevel::Success => writeln!(out, "{}", notice.message)?,
            NoticeLevel::Error => writeln!(out, "Warning: {}", notice.message)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use services::Clock;
    use storage::repository::{InMemoryRepository, ProgressRepository, StudyItemRepository};
    use tellect_core::model::{ItemId, Profile, StudyItemDraft};
    use tellect_core::time::fixed_now;
    use tokio::io::BufReader;

    async fn setup(items: usize) -> (InMemoryRepository, StudyLoopService, MemoryNotifier, UserId) {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        repo.upsert_profile(&Profile::new(owner, None, fixed_now()))
            .await
            .unwrap();
        for i in 0..items {
            let item = StudyItemDraft::new(format!("Q{i}"), format!("A{i}"), Subject::Math)
                .validate(ItemId::random(), owner, fixed_now())
                .unwrap();
            repo.insert_item(&item).await.unwrap();
        }
        let notices = MemoryNotifier::new();
        let loop_svc = StudyLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .with_notifier(Arc::new(notices.clone()));
        (repo, loop_svc, notices, owner)
    }

    async fn drive(
        loop_svc: &StudyLoopService,
        notices: &MemoryNotifier,
        owner: UserId,
        script: &str,
    ) -> (StudyOutcome, String) {
        let mut input = BufReader::new(script.as_bytes()).lines();
        let mut out = Vec::new();
        let outcome = run_study(loop_svc, notices, owner, None, &mut input, &mut out)
            .await
            .unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn completes_a_scripted_session() {
        let (repo, loop_svc, notices, owner) = setup(2).await;
        let (outcome, transcript) = drive(&loop_svc, &notices, owner, "\ny\n\nmaybe\nn\n").await;

        assert_eq!(
            outcome,
            StudyOutcome::Completed {
                correct: 1,
                incorrect: 1
            }
        );
        assert!(transcript.contains("Please answer y or n."));
        assert!(transcript.contains("Session completed! Earned 10 XP"));
        assert!(transcript.contains("50% accuracy"));
        assert_eq!(repo.get_profile(owner).await.unwrap().unwrap().xp(), 10);
    }

    #[tokio::test]
    async fn quitting_keeps_earlier_answers() {
        let (repo, loop_svc, notices, owner) = setup(3).await;
        let (outcome, _) = drive(&loop_svc, &notices, owner, "\ny\nq\n").await;

        assert_eq!(outcome, StudyOutcome::Quit { answered: 1 });
        assert_eq!(repo.get_profile(owner).await.unwrap().unwrap().xp(), 10);
    }

    #[tokio::test]
    async fn empty_collection_prints_guidance() {
        let (_repo, loop_svc, notices, owner) = setup(0).await;
        let (outcome, transcript) = drive(&loop_svc, &notices, owner, "").await;

        assert_eq!(outcome, StudyOutcome::NothingToStudy);
        assert!(transcript.contains("Nothing to study yet"));
    }
}
