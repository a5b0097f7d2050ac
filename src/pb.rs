//! Generated protobuf/gRPC bindings, nested to mirror the `.proto`
//! package layout (`formic.api`, `formic.store`).
pub mod formic {
    pub mod api {
        tonic::include_proto!("formic.api");
    }
    pub mod store {
        tonic::include_proto!("formic.store");
    }
}
