use clap::{Args, Subcommand};
use std::time::Instant;

use liftsync_core::{
    CustomExercise, Exercise, ExercisePicker, InvalidItemHeight, ReorderList, SyncCoordinator,
    TemplateExercise,
};

use super::{first_snapshot, report, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct ExerciseCommand {
    #[command(subcommand)]
    pub command: ExerciseSubcommand,
}

#[derive(Subcommand)]
pub enum ExerciseSubcommand {
    /// List the exercises of a plan in order
    List {
        /// Plan ID
        plan_id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add an exercise at the end of a plan
    Add {
        /// Plan ID
        plan_id: String,

        /// Exercise name
        name: String,

        /// Muscle group
        #[arg(long, short)]
        muscle_group: Option<String>,

        /// Description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Update an exercise of a plan
    Update {
        /// Plan ID
        plan_id: String,

        /// Exercise ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New muscle group
        #[arg(long, short)]
        muscle_group: Option<String>,

        /// New description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Remove an exercise and its sets from a plan
    Remove {
        /// Plan ID
        plan_id: String,

        /// Exercise ID
        id: String,
    },

    /// Move an exercise to another position (1-based)
    Move {
        /// Plan ID
        plan_id: String,

        /// Current position
        from: usize,

        /// New position
        to: usize,
    },

    /// Pick exercises from the catalog and custom exercises
    Pick {
        /// Plan ID
        plan_id: String,

        /// Only show entries whose name contains this text
        #[arg(long, short)]
        query: Option<String>,

        /// Add the entry with this ID (can be repeated)
        #[arg(long = "select", short = 's', value_name = "ID")]
        selected: Vec<String>,
    },
}

async fn find_exercise(
    coordinator: &SyncCoordinator,
    plan_id: &str,
    id: &str,
) -> Result<Exercise, Box<dyn std::error::Error>> {
    coordinator
        .get_exercises(plan_id)
        .await?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| format!("Exercise not found: {}", id).into())
}

/// Replays a drag from `from` to `to` (0-based) over `exercises` and returns
/// the exercises whose order changed.
fn drag_to(
    exercises: Vec<Exercise>,
    from: usize,
    to: usize,
    config: &Config,
) -> Result<Vec<Exercise>, InvalidItemHeight> {
    let height = config.item_height.value;
    let now = Instant::now();
    let mut list = ReorderList::new(height, config.sync_settings().settle_delay)?;
    list.on_remote(exercises, now);

    if !list.drag_start(from) {
        return Ok(Vec::new());
    }
    // Aim at the middle of the target row so float rounding cannot fall short.
    let rows = to as f32 - from as f32;
    let distance = rows * height + rows.signum() * height / 2.0;
    list.drag_move(distance);
    Ok(list.drag_end(now))
}

impl ExerciseCommand {
    pub async fn run(
        &self,
        coordinator: &SyncCoordinator,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ExerciseSubcommand::List { plan_id, format } => {
                let exercises = first_snapshot::<Exercise, _>(|h| {
                    coordinator.subscribe_exercises(plan_id, h)
                })
                .await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&exercises)?);
                    }
                    OutputFormat::Text => {
                        if exercises.is_empty() {
                            println!("No exercises found.");
                        }
                        for exercise in &exercises {
                            println!("{}  [{}]", exercise, exercise.id);
                        }
                    }
                }
                Ok(())
            }

            ExerciseSubcommand::Add {
                plan_id,
                name,
                muscle_group,
                description,
            } => {
                let position = coordinator.get_exercises(plan_id).await?.len() as i32;
                let mut exercise = Exercise::new(name.as_str()).with_order(position);
                if let Some(group) = muscle_group {
                    exercise = exercise.with_muscle_group(group.as_str());
                }
                if let Some(desc) = description {
                    exercise = exercise.with_description(desc.as_str());
                }

                let id = report(
                    "Added exercise",
                    coordinator.create_exercise(plan_id, &exercise).await,
                )?;
                if let Some(id) = id {
                    println!("{}  [{}]", exercise, id);
                }
                Ok(())
            }

            ExerciseSubcommand::Update {
                plan_id,
                id,
                name,
                muscle_group,
                description,
            } => {
                let mut exercise = find_exercise(coordinator, plan_id, id).await?;
                if let Some(name) = name {
                    exercise.name = name.clone();
                }
                if let Some(group) = muscle_group {
                    exercise.muscle_group = group.clone();
                }
                if let Some(desc) = description {
                    exercise.description = desc.clone();
                }

                report(
                    "Updated exercise",
                    coordinator.update_exercise(plan_id, &exercise).await,
                )?;
                println!("{}", exercise);
                Ok(())
            }

            ExerciseSubcommand::Remove { plan_id, id } => {
                let exercise = find_exercise(coordinator, plan_id, id).await?;
                report(
                    &format!("Removed exercise: {}", exercise.name),
                    coordinator.delete_exercise(plan_id, id).await,
                )?;
                Ok(())
            }

            ExerciseSubcommand::Move { plan_id, from, to } => {
                let exercises = coordinator.get_exercises(plan_id).await?;
                let count = exercises.len();
                if *from == 0 || *from > count || *to == 0 || *to > count {
                    return Err(format!("Positions must be between 1 and {}", count).into());
                }

                let changed = drag_to(exercises, from - 1, to - 1, config)?;
                if changed.is_empty() {
                    println!("Order unchanged.");
                    return Ok(());
                }

                let outcomes = coordinator.commit_order(plan_id, &changed).await;
                let failed = outcomes.iter().filter(|o| o.is_err()).count();
                println!(
                    "Moved exercise {} -> {} ({} updated, {} failed)",
                    from,
                    to,
                    changed.len() - failed,
                    failed
                );
                Ok(())
            }

            ExerciseSubcommand::Pick {
                plan_id,
                query,
                selected,
            } => {
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

                if selected.is_empty() {
                    let visible = picker.visible();
                    if visible.is_empty() {
                        println!("No matching exercises.");
                    }
                    for definition in &visible {
                        println!(
                            "{}  {} ({}, {})",
                            definition.id,
                            definition.name,
                            definition.muscle_group,
                            definition.source
                        );
                    }
                    return Ok(());
                }

                for id in selected {
                    if !picker.merged().iter().any(|d| &d.id == id) {
                        return Err(format!("Unknown exercise: {}", id).into());
                    }
                    picker.set_selected(id, true);
                }

                let outcomes = coordinator
                    .add_definitions_to_plan(plan_id, &picker.selected())
                    .await?;
                let mut added = 0;
                for outcome in outcomes {
                    if report("Added exercise", outcome).is_ok() {
                        added += 1;
                    }
                }
                println!("{} exercise(s) added to plan {}", added, plan_id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercises(n: i32) -> Vec<Exercise> {
        (0..n)
            .map(|i| {
                Exercise::new(format!("E{}", i))
                    .with_id(format!("e{}", i))
                    .with_order(i)
            })
            .collect()
    }

    fn config(item_height: &str) -> Config {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, format!("item_height: {}\n", item_height)).unwrap();
        Config::load(Some(config_path)).unwrap()
    }

    fn ids(items: &[Exercise]) -> Vec<&str> {
        items.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_drag_down_renumbers_span() {
        let changed = drag_to(exercises(5), 0, 3, &config("80.0")).unwrap();
        assert_eq!(ids(&changed), vec!["e1", "e2", "e3", "e0"]);
        let orders: Vec<Option<i32>> = changed.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_drag_up_with_odd_row_height() {
        let changed = drag_to(exercises(4), 3, 1, &config("33.3")).unwrap();
        assert_eq!(ids(&changed), vec!["e3", "e1", "e2"]);
    }

    #[test]
    fn test_same_position_changes_nothing() {
        assert!(drag_to(exercises(3), 1, 1, &config("80.0"))
            .unwrap()
            .is_empty());
    }
}
