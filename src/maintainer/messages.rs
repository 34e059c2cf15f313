//! Control-channel messages. Promotions and deletions carry an
//! `Item` directly and so live on their own generically-typed channels;
//! control calls never touch an `Item` and so need no type parameter here.

use crossbeam_channel::Sender;

pub(crate) enum ControlMsg {
    GetSize(Sender<i64>),
    GetDropped(Sender<u64>),
    SetMaxSize(i64, Sender<()>),
    Gc(Sender<u64>),
    Clear(Sender<()>),
    SyncUpdates(Sender<()>),
    Stop(Sender<()>),
}
