pub mod openai;
pub mod youtube;
