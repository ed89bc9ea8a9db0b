use clap::{Args, Subcommand};

use liftsync_core::{next_set_number, SetWriteBuffer, SyncCoordinator, WorkoutSet};

use super::{first_snapshot, report, OutputFormat};

#[derive(Args)]
pub struct SetCommand {
    #[command(subcommand)]
    pub command: SetSubcommand,
}

#[derive(Subcommand)]
pub enum SetSubcommand {
    /// List the sets of an exercise
    List {
        /// Plan ID
        plan_id: String,

        /// Exercise ID
        exercise_id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Log a new set
    Add {
        /// Plan ID
        plan_id: String,

        /// Exercise ID
        exercise_id: String,

        /// Repetitions
        #[arg(long, short)]
        reps: i32,

        /// Weight in kg
        #[arg(long, short)]
        weight: f64,
    },

    /// Change reps or weight of a set
    Update {
        /// Plan ID
        plan_id: String,

        /// Exercise ID
        exercise_id: String,

        /// Set ID
        id: String,

        /// New repetitions
        #[arg(long, short)]
        reps: Option<i32>,

        /// New weight in kg
        #[arg(long, short)]
        weight: Option<f64>,
    },

    /// Delete a set and renumber the ones after it
    Delete {
        /// Plan ID
        plan_id: String,

        /// Exercise ID
        exercise_id: String,

        /// Set ID
        id: String,
    },
}

impl SetCommand {
    pub async fn run(
        &self,
        coordinator: &SyncCoordinator,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SetSubcommand::List {
                plan_id,
                exercise_id,
                format,
            } => {
                let sets = first_snapshot::<WorkoutSet, _>(|h| {
                    coordinator.subscribe_sets(plan_id, exercise_id, h)
                })
                .await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&sets)?);
                    }
                    OutputFormat::Text => {
                        if sets.is_empty() {
                            println!("No sets logged.");
                        }
                        for set in &sets {
                            match set.performed_at {
                                Some(at) => println!(
                                    "{}  [{}] {}",
                                    set,
                                    set.id,
                                    at.format("%Y-%m-%d %H:%M")
                                ),
                                None => println!("{}  [{}]", set, set.id),
                            }
                        }
                    }
                }
                Ok(())
            }

            SetSubcommand::Add {
                plan_id,
                exercise_id,
                reps,
                weight,
            } => {
                let sets = coordinator.get_sets(plan_id, exercise_id).await?;
                let set = WorkoutSet::new(next_set_number(&sets), *reps, *weight);

                let id = report(
                    "Logged set",
                    coordinator.create_set(plan_id, exercise_id, &set).await,
                )?;
                match id {
                    Some(id) => println!("{}  [{}]", set, id),
                    None => println!("{}", set),
                }
                Ok(())
            }

            SetSubcommand::Update {
                plan_id,
                exercise_id,
                id,
                reps,
                weight,
            } => {
                if reps.is_none() && weight.is_none() {
                    return Err("Nothing to update; pass --reps and/or --weight".into());
                }

                let mut set = coordinator
                    .get_sets(plan_id, exercise_id)
                    .await?
                    .into_iter()
                    .find(|s| &s.id == id)
                    .ok_or_else(|| format!("Set not found: {}", id))?;
                if let Some(reps) = reps {
                    set.reps = *reps;
                }
                if let Some(weight) = weight {
                    set.weight = *weight;
                }

                let buffer = SetWriteBuffer::spawn(
                    coordinator.clone(),
                    plan_id.as_str(),
                    exercise_id.as_str(),
                );
                buffer.edit(set.clone());
                let outcomes = buffer.flush().await;
                buffer.close().await;

                for outcome in outcomes {
                    report("Updated set", outcome)?;
                }
                println!("{}", set);
                Ok(())
            }

            SetSubcommand::Delete {
                plan_id,
                exercise_id,
                id,
            } => {
                let sets = coordinator.get_sets(plan_id, exercise_id).await?;
                if !sets.iter().any(|s| &s.id == id) {
                    return Err(format!("Set not found: {}", id).into());
                }

                let remaining = coordinator
                    .delete_set_and_renumber(plan_id, exercise_id, &sets, id)
                    .await?;
                println!("Deleted set {}", id);
                for set in &remaining {
                    println!("{}  [{}]", set, set.id);
                }
                Ok(())
            }
        }
    }
}
