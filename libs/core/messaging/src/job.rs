//! Job trait for queue payloads.

use serde::{de::DeserializeOwned, Serialize};

/// A payload carried by a durable queue.
///
/// The worker deserializes each delivery into `Self`; a body that does not
/// parse is rejected without reaching the processor.
///
/// # Example
///
/// ```rust
/// use messaging::Job;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct ResizeImage {
///     image_id: i64,
///     width: u32,
/// }
///
/// impl Job for ResizeImage {
///     fn job_id(&self) -> String {
///         self.image_id.to_string()
///     }
/// }
/// ```
pub trait Job: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier used in logs.
    fn job_id(&self) -> String;

    /// Job type name for logging and metrics.
    fn job_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
