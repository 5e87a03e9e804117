//! Wire protocol: framing and the batch codec.
//!
//! The two layers are independent of the transport; TCP and Unix sockets carry
//! identical bytes.
//!
//! ```rust
//! use gazestream::protocol::{codec, frame};
//! use gazestream::types::{Batch, GazeRecord};
//!
//! let batch = Batch::single(GazeRecord { pupil_diameter: 42, ..Default::default() });
//! let payload = codec::encode(&batch);
//! let wire = frame::encode_frame(&payload).unwrap();
//!
//! let len = frame::decode_header(&wire[..frame::HEADER_SIZE]).unwrap();
//! let decoded = codec::decode(&wire[frame::HEADER_SIZE..frame::HEADER_SIZE + len]).unwrap();
//! assert_eq!(decoded, batch);
//! ```

pub mod codec;
pub mod frame;

pub use frame::{HEADER_SIZE, MAX_FRAME_SIZE};
