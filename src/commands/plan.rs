use clap::{Args, Subcommand};

use liftsync_core::{SyncCoordinator, TrainingPlan};

use super::{confirm, first_snapshot, report, OutputFormat};

#[derive(Args)]
pub struct PlanCommand {
    #[command(subcommand)]
    pub command: PlanSubcommand,
}

#[derive(Subcommand)]
pub enum PlanSubcommand {
    /// Create a new training plan
    Create {
        /// Plan name
        name: String,

        /// Muscle groups the plan targets (free text)
        #[arg(long, short)]
        muscle_groups: Option<String>,

        /// Description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// List training plans, oldest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a plan with its exercises
    Show {
        /// Plan ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a plan
    Update {
        /// Plan ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New muscle groups
        #[arg(long, short)]
        muscle_groups: Option<String>,

        /// New description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Delete a plan with all its exercises and sets
    Delete {
        /// Plan ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

async fn find_plan(
    coordinator: &SyncCoordinator,
    id: &str,
) -> Result<TrainingPlan, Box<dyn std::error::Error>> {
    first_snapshot::<TrainingPlan, _>(|h| coordinator.subscribe_plans(h))
        .await?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| format!("Plan not found: {}", id).into())
}

impl PlanCommand {
    pub async fn run(
        &self,
        coordinator: &SyncCoordinator,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PlanSubcommand::Create {
                name,
                muscle_groups,
                description,
            } => {
                let mut plan = TrainingPlan::new(name.as_str());
                if let Some(groups) = muscle_groups {
                    plan = plan.with_muscle_groups(groups.as_str());
                }
                if let Some(desc) = description {
                    plan = plan.with_description(desc.as_str());
                }

                report("Created plan", coordinator.save_plan(&plan).await)?;
                println!("{}", plan);
                println!("ID: {}", plan.id);
                Ok(())
            }

            PlanSubcommand::List { format } => {
                let plans =
                    first_snapshot::<TrainingPlan, _>(|h| coordinator.subscribe_plans(h)).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&plans)?);
                    }
                    OutputFormat::Text => {
                        if plans.is_empty() {
                            println!("No plans found.");
                            return Ok(());
                        }
                        for plan in &plans {
                            if plan.muscle_groups.is_empty() {
                                println!("{}  {}", plan.id, plan.name);
                            } else {
                                println!("{}  {} ({})", plan.id, plan.name, plan.muscle_groups);
                            }
                        }
                    }
                }
                Ok(())
            }

            PlanSubcommand::Show { id, format } => {
                let plan = find_plan(coordinator, id).await?;
                // Exercises live under the user's document tree only.
                let exercises = match coordinator.current_user_id() {
                    Some(_) => coordinator.get_exercises(id).await?,
                    None => Vec::new(),
                };

                match format {
                    OutputFormat::Json => {
                        let value = serde_json::json!({
                            "plan": plan,
                            "exercises": exercises,
                        });
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", plan);
                        println!();
                        if exercises.is_empty() {
                            println!("No exercises yet.");
                        }
                        for exercise in &exercises {
                            println!("{}", exercise);
                        }
                    }
                }
                Ok(())
            }

            PlanSubcommand::Update {
                id,
                name,
                muscle_groups,
                description,
            } => {
                let mut plan = find_plan(coordinator, id).await?;
                if let Some(name) = name {
                    plan.name = name.clone();
                }
                if let Some(groups) = muscle_groups {
                    plan.muscle_groups = groups.clone();
                }
                if let Some(desc) = description {
                    plan.description = desc.clone();
                }

                report("Updated plan", coordinator.update_plan(&plan).await)?;
                println!("{}", plan);
                Ok(())
            }

            PlanSubcommand::Delete { id, force } => {
                let plan = find_plan(coordinator, id).await?;

                if !force
                    && !confirm(&format!(
                        "Delete plan '{}' with all its exercises and sets?",
                        plan.name
                    ))?
                {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                report(
                    &format!("Deleted plan: {}", plan.name),
                    coordinator.delete_plan(id).await,
                )?;
                Ok(())
            }
        }
    }
}
