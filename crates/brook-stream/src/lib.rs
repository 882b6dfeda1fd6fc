#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

mod loss;
mod planner;
mod receiver;
mod sender;

pub use loss::LossWindow;
pub use planner::{GenerationPlan, GenerationPlanner, StreamConfig};
pub use receiver::{ReceiverConfig, StreamEvent, VideoReceiver};
pub use sender::{GenerationView, SenderCounters, VideoSender};
