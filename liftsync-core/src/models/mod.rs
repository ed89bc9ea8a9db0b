mod exercise;
mod training_plan;
mod user;
mod workout_set;

pub use exercise::{
    CustomExercise, DefinitionSource, Exercise, ExerciseDefinition, TemplateExercise,
};
pub use training_plan::TrainingPlan;
pub use user::User;
pub use workout_set::WorkoutSet;
