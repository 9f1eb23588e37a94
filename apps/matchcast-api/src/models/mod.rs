pub mod broadcast_record;
pub mod fan;
