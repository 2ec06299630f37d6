//! Single-threaded backend.

use crate::backend::{BackendType, ComputeBackend, DeviceInfo};

/// Runs every work item on the calling thread, in index order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial".into(),
            backend_type: BackendType::Serial,
            threads: 1,
        }
    }

    fn map_indexed<T, F>(&self, count: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..count).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_preserves_order() {
        let out = SerialBackend.map_indexed(5, |i| i * i);
        assert_eq!(out, vec![0, 1, 4, 9, 16]);
        assert_eq!(SerialBackend.device_info().threads, 1);
    }
}
