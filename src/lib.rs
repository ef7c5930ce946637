pub mod taobao;
pub use self::taobao::{stream, ChatContext, ChatOptions, Event};

pub(crate) mod util;
