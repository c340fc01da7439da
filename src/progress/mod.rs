pub mod events;
pub mod flagging;
pub mod ledger;
