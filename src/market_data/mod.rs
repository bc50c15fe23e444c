pub mod candle_buffer;
pub mod kline_stream;

pub use candle_buffer::{CandleBuffer, CandleKey};
pub use kline_stream::run_kline_stream;
