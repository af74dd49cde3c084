use std::io::Write;

use services::{AppServices, GeneratedFlashcards, GeneratedMindmap, MemoryNotifier};
use tellect_core::model::{Mindmap, StudyItem, StudyItemDraft, Subject};
use tellect_core::scoring;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{Command, GenerateKind};
use crate::study::{print_notices, run_study};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

pub async fn dispatch<W: Write>(
    app: &AppServices,
    notices: &MemoryNotifier,
    command: Command,
    out: &mut W,
) -> AppResult<()> {
    let user = app.user();
    match command {
        Command::Study { subject, shuffle } => {
            let subject = Subject::parse_filter(&subject)?;
            let loop_svc = app.study_loop().as_ref().clone().with_shuffle(shuffle);
            let mut input = BufReader::new(tokio::io::stdin()).lines();
            run_study(&loop_svc, notices, user, subject, &mut input, out).await?;
        }
        Command::Add {
            question,
            answer,
            subject,
            difficulty,
        } => {
            let draft = StudyItemDraft::new(question, answer, subject).with_difficulty(difficulty);
            let item = app.items().create_item(user, draft).await?;
            writeln!(out, "Added {}", item.id())?;
        }
        Command::List { subject } => {
            let subject = Subject::parse_filter(&subject)?;
            let items = app.items().list_items(user, subject).await?;
            if items.is_empty() {
                writeln!(out, "No flashcards yet.")?;
            }
            for item in &items {
                write_item(out, item)?;
            }
        }
        Command::Delete { id } => {
            app.items().delete_item(user, id).await?;
            writeln!(out, "Deleted {id}")?;
        }
        Command::Generate {
            kind,
            topic,
            subject,
            save,
        } => match kind {
            GenerateKind::Flashcards => {
                let generated = app.generation().generate_flashcards(&topic, subject).await?;
                write_flashcards(out, &generated)?;
                if save {
                    let saved = app
                        .content()
                        .save_flashcards(user, subject, generated)
                        .await?;
                    writeln!(
                        out,
                        "Saved {} flashcards, earned {} XP.",
                        saved.content.len(),
                        saved.xp_awarded
                    )?;
                }
            }
            GenerateKind::Mindmap => {
                let generated = app.generation().generate_mindmap(&topic, subject).await?;
                write_generated_mindmap(out, &generated)?;
                if save {
                    let saved = app.content().save_mindmap(user, generated).await?;
                    writeln!(out, "Saved mindmap, earned {} XP.", saved.xp_awarded)?;
                }
            }
        },
        Command::Mindmaps => {
            let maps = app.mindmaps().list_mindmaps(user).await?;
            if maps.is_empty() {
                writeln!(out, "No mindmaps yet.")?;
            }
            for map in &maps {
                write_mindmap(out, map)?;
            }
        }
        Command::Progress => {
            let dashboard = app.progress().dashboard(user).await?;
            writeln!(out, "{}", dashboard.display_name)?;
            writeln!(
                out,
                "Level {} | {} XP | {} XP to next level ({:.0}% of level)",
                dashboard.level,
                dashboard.xp,
                dashboard.xp_to_next_level,
                dashboard.level_progress * 100.0
            )?;
            writeln!(
                out,
                "{} flashcards | studied {} times | {}% average accuracy | {} mindmaps",
                dashboard.item_count,
                dashboard.total_studied,
                dashboard.average_accuracy,
                dashboard.mindmap_count
            )?;
            if let Some(average) = dashboard.average_mastery {
                writeln!(out, "Mastery: {average:.0}% average")?;
                for topic in &dashboard.subject_mastery {
                    writeln!(out, "  {}: {}%", topic.name, topic.mastery)?;
                }
                let weak: Vec<&str> = dashboard
                    .areas_to_improve()
                    .map(|topic| topic.name.as_str())
                    .collect();
                if !weak.is_empty() {
                    writeln!(out, "Areas to improve: {}", weak.join(", "))?;
                }
            }
            if !dashboard.recent_sessions.is_empty() {
                writeln!(out, "Recent sessions:")?;
            }
            for row in &dashboard.recent_sessions {
                let record = &row.record;
                writeln!(
                    out,
                    "  {} | {} items | {}/{} correct | {} min | +{} XP",
                    record.completed_at().format("%Y-%m-%d %H:%M"),
                    record.items_count(),
                    record.correct(),
                    record.items_count(),
                    record.duration_minutes(),
                    record.xp_earned()
                )?;
            }
        }
    }
    print_notices(notices, out)?;
    Ok(())
}

fn write_item<W: Write>(out: &mut W, item: &StudyItem) -> std::io::Result<()> {
    let stats = item.stats();
    writeln!(
        out,
        "{} [{}/{}] {}% over {} | {}",
        item.id(),
        item.subject(),
        item.difficulty(),
        scoring::accuracy(stats.times_correct(), stats.times_studied()),
        stats.times_studied(),
        item.prompt()
    )
}

fn write_flashcards<W: Write>(out: &mut W, generated: &GeneratedFlashcards) -> std::io::Result<()> {
    for (idx, card) in generated.flashcards.iter().enumerate() {
        writeln!(out, "{}. Q: {}", idx + 1, card.question)?;
        writeln!(out, "   A: {}", card.answer)?;
    }
    Ok(())
}

fn write_generated_mindmap<W: Write>(
    out: &mut W,
    generated: &GeneratedMindmap,
) -> std::io::Result<()> {
    let draft = &generated.mindmap;
    writeln!(out, "{}", draft.title)?;
    for node in &draft.nodes {
        writeln!(out, "  [{}] {}", node.id, node.label)?;
    }
    for edge in &draft.edges {
        writeln!(out, "  {} -> {}", edge.source, edge.target)?;
    }
    Ok(())
}

fn write_mindmap<W: Write>(out: &mut W, map: &Mindmap) -> std::io::Result<()> {
    let center = map.central_node().map_or("-", |node| node.label.as_str());
    writeln!(
        out,
        "{} {} ({} nodes, centre: {})",
        map.id(),
        map.title(),
        map.nodes().len(),
        center
    )
}
