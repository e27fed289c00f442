// tplprobe infra-worker - subprocess adapters for the WorkerHost port

pub mod protocol;
pub mod supervisor;

pub use supervisor::{default_recipes, LaunchRecipe, ProcessSupervisor};
