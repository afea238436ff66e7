pub mod answer_marker;
pub mod id_sequence;
pub mod subject;
pub mod time;
