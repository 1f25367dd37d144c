//! Transfer tuning

/// Default staging buffer size for buffered copy loops
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Settings for [`transfer_to`](crate::transfer::transfer_to) and
/// [`transfer_from`](crate::transfer::transfer_from)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Capacity of the staging buffer used when no zero-copy path applies
    pub buffer_size: usize,
    /// Try descriptor-to-descriptor copies before falling back
    pub zero_copy: bool,
}

impl TransferConfig {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            zero_copy: true,
        }
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_zero_copy(mut self, enabled: bool) -> Self {
        self.zero_copy = enabled;
        self
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self::new()
    }
}
