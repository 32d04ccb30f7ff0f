pub mod metricmaster_prompts;

pub use metricmaster_prompts::{main_prompt, scheduled_prompt};
