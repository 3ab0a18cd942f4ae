/*!
 * Batch translation pipeline.
 *
 * The pipeline is split into several submodules:
 *
 * - `client`: the backend contract and the passthrough backend
 * - `retry`: failure classification and exponential backoff
 * - `context_buffer`: the rolling window of recent source texts
 * - `scheduler`: window planning, progress events and persistence
 * - `refine`: single-block refinement and fandom identification
 * - `prompts`: prompt templates shared by model-backed clients
 */

// Re-export main types for easier usage
pub use self::client::{PassthroughClient, RefineRequest, TranslateOptions, TranslationClient};
pub use self::context_buffer::ContextBuffer;
pub use self::refine::{generate_glossary, identify_fandom, refine_block, RefineOutcome};
pub use self::retry::{is_retryable, RetryPolicy};
pub use self::scheduler::{
    plan_windows, BatchScheduler, RunOutcome, SchedulerConfig, SchedulerEvent, StopHandle, WindowInfo,
};

// Submodules
pub mod client;
pub mod context_buffer;
pub mod prompts;
pub mod refine;
pub mod retry;
pub mod scheduler;
