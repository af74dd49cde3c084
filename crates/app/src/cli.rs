use clap::{Parser, Subcommand, ValueEnum};
use tellect_core::model::{Difficulty, ItemId, Subject, UserId};

use crate::db_url::DEFAULT_DB_URL;

#[derive(Debug, Parser)]
#[command(name = "tellect", version, about = "Study flashcards, build mindmaps, earn XP.", long_about = None)]
pub struct Cli {
    /// SQLite database URL or path.
    #[arg(long, env = "TELLECT_DB_URL", default_value = DEFAULT_DB_URL, global = true)]
    pub db: String,
    /// Learner id. Defaults to the first local profile, created if none exist.
    #[arg(long, env = "TELLECT_USER_ID", global = true)]
    pub user: Option<UserId>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a flashcard session in the terminal.
    Study {
        /// Only study this subject ("all" for everything).
        #[arg(long, default_value = "all")]
        subject: String,
        /// Shuffle items instead of newest first.
        #[arg(long)]
        shuffle: bool,
    },
    /// Add a flashcard.
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        #[arg(long, default_value = "general")]
        subject: Subject,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
    },
    /// List flashcards, newest first.
    List {
        #[arg(long, default_value = "all")]
        subject: String,
    },
    /// Delete a flashcard by id.
    Delete { id: ItemId },
    /// Generate flashcards or a mindmap with the configured AI provider.
    Generate {
        kind: GenerateKind,
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "general")]
        subject: Subject,
        /// Save the result and earn XP.
        #[arg(long)]
        save: bool,
    },
    /// List saved mindmaps.
    Mindmaps,
    /// Show XP, level and study statistics.
    Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenerateKind {
    Flashcards,
    Mindmap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_study_with_filters() {
        let cli = Cli::try_parse_from(["tellect", "study", "--subject", "math", "--shuffle"]).unwrap();
        match cli.command {
            Command::Study { subject, shuffle } => {
                assert_eq!(subject, "math");
                assert!(shuffle);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_options_follow_subcommands() {
        let user = UserId::random();
        let cli = Cli::try_parse_from([
            "tellect",
            "progress",
            "--db",
            "sqlite::memory:",
            "--user",
            &user.to_string(),
        ])
        .unwrap();
        assert_eq!(cli.db, "sqlite::memory:");
        assert_eq!(cli.user, Some(user));
    }

    #[test]
    fn generate_requires_topic_and_parses_subject() {
        assert!(Cli::try_parse_from(["tellect", "generate", "mindmap"]).is_err());

        let cli = Cli::try_parse_from([
            "tellect", "generate", "flashcards", "--topic", "Fractions", "--subject", "Math",
            "--save",
        ])
        .unwrap();
        match cli.command {
            Command::Generate {
                kind,
                topic,
                subject,
                save,
            } => {
                assert_eq!(kind, GenerateKind::Flashcards);
                assert_eq!(topic, "Fractions");
                assert_eq!(subject, Subject::Math);
                assert!(save);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_subject_is_rejected() {
        assert!(
            Cli::try_parse_from(["tellect", "add", "--question", "q", "--answer", "a", "--subject", "art"])
                .is_err()
        );
    }
}
