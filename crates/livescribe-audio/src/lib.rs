pub mod capture;
pub mod device;
pub mod source;
pub mod wav;

pub use capture::{CpalSource, CpalSourceFactory};
pub use device::DeviceManager;
pub use source::{f32_to_i16, AudioSource, AudioSourceFactory, FrameRead};
pub use wav::{WavSource, WavSourceFactory};

use ringbuf::traits::Split;
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a ring buffer split into producer and consumer halves.
pub fn create_ring_buffer(capacity: usize) -> (HeapProd<f32>, HeapCons<f32>) {
    HeapRb::<f32>::new(capacity).split()
}
