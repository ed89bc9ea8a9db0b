use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use liftsync_core::{CustomExercise, ExercisePicker, SyncCoordinator, TemplateExercise};

use super::{first_snapshot, report, OutputFormat};

#[derive(Args)]
pub struct CatalogCommand {
    #[command(subcommand)]
    pub command: CatalogSubcommand,
}

#[derive(Subcommand)]
pub enum CatalogSubcommand {
    /// List custom exercises followed by catalog entries
    List {
        /// Only show entries whose name contains this text
        #[arg(long, short)]
        query: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a custom exercise
    Add {
        /// Exercise name
        name: String,

        /// Muscle group
        #[arg(long, short)]
        muscle_group: Option<String>,

        /// Description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Seed catalog entries from a YAML file
    Import {
        /// YAML file with a list of entries (name, muscle_group, description, id)
        file: PathBuf,
    },
}

fn read_catalog(path: &Path) -> Result<Vec<TemplateExercise>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let entries: Vec<TemplateExercise> = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;
    if let Some(entry) = entries.iter().find(|e| e.name.trim().is_empty()) {
        return Err(format!("Catalog entry without a name (id '{}')", entry.id).into());
    }
    Ok(entries)
}

impl CatalogCommand {
    pub async fn run(
        &self,
        coordinator: &SyncCoordinator,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CatalogSubcommand::List { query, format } => {
                let mut picker = ExercisePicker::new();
                picker.set_custom(
                    first_snapshot::<CustomExercise, _>(|h| {
                        coordinator.subscribe_custom_exercises(h)
                    })
                    .await?,
                );
                picker.set_templates(
                    first_snapshot::<TemplateExercise, _>(|h| {
                        coordinator.subscribe_template_exercises(h)
                    })
                    .await?,
                );
                if let Some(query) = query {
                    picker.set_query(query.as_str());
                }

                let visible = picker.visible();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&visible)?);
                    }
                    OutputFormat::Text => {
                        if visible.is_empty() {
                            println!("No exercises found.");
                        }
                        for definition in &visible {
                            println!(
                                "{:<8} {}  {} ({})",
                                definition.source.to_string(),
                                definition.id,
                                definition.name,
                                definition.muscle_group
                            );
                        }
                    }
                }
                Ok(())
            }

            CatalogSubcommand::Add {
                name,
                muscle_group,
                description,
            } => {
                let mut exercise = CustomExercise::new(name.as_str());
                if let Some(group) = muscle_group {
                    exercise = exercise.with_muscle_group(group.as_str());
                }
                if let Some(desc) = description {
                    exercise = exercise.with_description(desc.as_str());
                }

                let id = report(
                    &format!("Created custom exercise: {}", exercise.name),
                    coordinator.create_custom_exercise(&exercise).await,
                )?;
                if let Some(id) = id {
                    println!("ID: {}", id);
                }
                Ok(())
            }

            CatalogSubcommand::Import { file } => {
                let entries = read_catalog(file)?;
                let mut seeded = 0;
                for entry in &entries {
                    report(
                        &format!("Seeded {}", entry.name),
                        coordinator.seed_template_exercise(entry).await,
                    )?;
                    seeded += 1;
                }
                println!("{} catalog entries imported", seeded);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_catalog_defaults_optional_fields() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("catalog.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "- name: Deadlift").unwrap();
        writeln!(file, "  muscle_group: Back").unwrap();
        writeln!(file, "- name: Plank").unwrap();
        writeln!(file, "  id: plank").unwrap();

        let entries = read_catalog(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].muscle_group, "Back");
        assert_eq!(entries[0].id, "");
        assert_eq!(entries[1].id, "plank");
        assert_eq!(entries[1].description, "");
    }

    #[test]
    fn test_read_catalog_rejects_blank_name() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("catalog.yaml");
        std::fs::write(&path, "- name: \"  \"\n  id: x\n").unwrap();

        let err = read_catalog(&path).unwrap_err();
        assert!(err.to_string().contains("without a name"));
    }

    #[test]
    fn test_read_catalog_missing_file() {
        let temp_dir = tempdir().unwrap();
        let err = read_catalog(&temp_dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
