//! Lesson catalog commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use signpath_core::{Lesson, LessonCatalog};

/// Catalog arguments.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// List lessons
    List {
        /// Only lessons in this category
        #[arg(long)]
        category: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Run catalog command.
pub fn run(catalog: &LessonCatalog, args: CatalogArgs) -> Result<()> {
    match args.command {
        CatalogCommands::List { category, json } => list(catalog, category.as_deref(), json),
    }
}

fn list(catalog: &LessonCatalog, category: Option<&str>, json: bool) -> Result<()> {
    let lessons: Vec<&Lesson> = match category {
        Some(category) => catalog.by_category(category).collect(),
        None => catalog.iter().collect(),
    };

    if json {
        return super::print_json(&lessons);
    }
    if lessons.is_empty() {
        println!("No lessons in the catalog.");
        return Ok(());
    }
    println!("{}", lesson_table(&lessons));
    Ok(())
}

fn lesson_table(lessons: &[&Lesson]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("XP").fg(Color::Cyan),
        Cell::new("Minutes").fg(Color::Cyan),
        Cell::new("Points").fg(Color::Cyan),
    ]);

    for lesson in lessons {
        table.add_row(vec![
            Cell::new(lesson.id),
            Cell::new(&lesson.title),
            Cell::new(&lesson.category),
            Cell::new(lesson.experience_points),
            Cell::new(lesson.estimated_minutes),
            Cell::new(lesson.total_points),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_every_lesson() {
        let catalog = LessonCatalog::from_toml_str(
            r#"
[[lessons]]
id = 1
title = "Alphabet A-E"
category = "alphabet"

[[lessons]]
id = 2
title = "Hello and goodbye"
category = "greetings"
"#,
        )
        .unwrap();
        let lessons: Vec<&Lesson> = catalog.iter().collect();

        let rendered = lesson_table(&lessons).to_string();

        assert!(rendered.contains("Alphabet A-E"));
        assert!(rendered.contains("greetings"));
    }
}
