//! Generated bindings for the collaborator protos.

pub mod registry {
    tonic::include_proto!("apiary.registry");
}

pub mod messages {
    tonic::include_proto!("apiary.messages");
}

pub mod sessions {
    tonic::include_proto!("apiary.sessions");
}
