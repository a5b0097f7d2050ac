//! Binds [`crate::fsops::FilesystemOps`] to the generated `Api` gRPC
//! service. Translates the library's `Option`/`Result` shapes into the
//! wire convention spec.md section 9 describes: a missing entry is
//! encoded as a zero-valued reply, not a distinct `NotFound` status,
//! except where the verb's own protocol calls for an explicit abort
//! (`AlreadyExists` on create/mkdir/symlink/rename).

use tonic::{Request, Response, Status};
use tracing::instrument;

use crate::error::ServerError;
use crate::fsops::attr::SetAttrRequest;
use crate::fsops::model::Attr as InternalAttr;
use crate::fsops::FilesystemOps;
use crate::pb::formic::api::api_server::Api;
use crate::pb::formic::api::{
    Attr, DirEnt, DirEntries, FileChunk, GetxattrRequest, GetxattrResponse, ListxattrRequest,
    ListxattrResponse, LookupRequest, Node, ReadlinkResponse, RemovexattrRequest,
    RemovexattrResponse, RenameRequest, RenameResponse, SetxattrRequest, SetxattrResponse,
    StatfsRequest, StatfsResponse, SymlinkRequest, WriteResponse,
};
use crate::pb::formic::api::SetAttrRequest as WireSetAttrRequest;

fn zero_attr() -> Attr {
    Attr { inode: 0, atime: 0, mtime: 0, ctime: 0, crtime: 0, mode: 0, valid: 0, size: 0, uid: 0, gid: 0 }
}

fn to_wire_attr(attr: InternalAttr) -> Attr {
    Attr {
        inode: attr.inode,
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: attr.crtime,
        mode: attr.mode,
        valid: 1,
        size: attr.size,
        uid: attr.uid,
        gid: attr.gid,
    }
}

fn from_wire_setattr(req: WireSetAttrRequest) -> (u64, SetAttrRequest) {
    let inode = req.inode;
    let mut out = SetAttrRequest::default();
    if req.set_mode {
        out.mode = Some(req.mode);
    }
    if req.set_size {
        out.size = Some(req.size);
    }
    if req.set_uid {
        out.uid = Some(req.uid);
    }
    if req.set_gid {
        out.gid = Some(req.gid);
    }
    if req.set_atime {
        out.atime = Some(req.atime);
    }
    if req.set_mtime {
        out.mtime = Some(req.mtime);
    }
    (inode, out)
}

/// The `tonic`-generated `Api` service, backed by one shared
/// [`FilesystemOps`] handle.
pub struct ApiService {
    ops: FilesystemOps,
}

impl ApiService {
    pub fn new(ops: FilesystemOps) -> Self {
        ApiService { ops }
    }

    /// Bumps the relevant counter for errors that aren't just "caller
    /// asked for something invalid" before converting to a wire status.
    fn status(&self, err: ServerError) -> Status {
        match &err {
            ServerError::Conflict(_) => self.ops.metrics.record_conflict(),
            ServerError::Timeout(_) => self.ops.metrics.record_timeout(),
            _ => {}
        }
        err.into()
    }
}

#[tonic::async_trait]
impl Api for ApiService {
    #[instrument(skip(self, request))]
    async fn get_attr(&self, request: Request<Node>) -> Result<Response<Attr>, Status> {
        let inode = request.into_inner().inode;
        let attr = self.ops.getattr(inode).await.map_err(|e| self.status(e))?;
        Ok(Response::new(attr.map(to_wire_attr).unwrap_or_else(zero_attr)))
    }

    #[instrument(skip(self, request))]
    async fn set_attr(&self, request: Request<WireSetAttrRequest>) -> Result<Response<Attr>, Status> {
        let (inode, internal) = from_wire_setattr(request.into_inner());
        let attr = self.ops.setattr(inode, internal).await.map_err(|e| self.status(e))?;
        Ok(Response::new(attr.map(to_wire_attr).unwrap_or_else(zero_attr)))
    }

    #[instrument(skip(self, request))]
    async fn create(&self, request: Request<DirEnt>) -> Result<Response<DirEnt>, Status> {
        let req = request.into_inner();
        let attr = self.ops.create(req.parent, &req.name).await.map_err(|e| self.status(e))?;
        Ok(Response::new(DirEnt { name: req.name, parent: req.parent, attr: Some(to_wire_attr(attr)) }))
    }

    #[instrument(skip(self, request))]
    async fn mk_dir(&self, request: Request<DirEnt>) -> Result<Response<DirEnt>, Status> {
        let req = request.into_inner();
        let attr = self.ops.mkdir(req.parent, &req.name).await.map_err(|e| self.status(e))?;
        Ok(Response::new(DirEnt { name: req.name, parent: req.parent, attr: Some(to_wire_attr(attr)) }))
    }

    #[instrument(skip(self, request))]
    async fn read(&self, request: Request<Node>) -> Result<Response<FileChunk>, Status> {
        let inode = request.into_inner().inode;
        let payload = self.ops.read(inode, 0, 0).await.map_err(|e| self.status(e))?;
        Ok(Response::new(FileChunk { inode, offset: 0, payload }))
    }

    #[instrument(skip(self, request))]
    async fn write(&self, request: Request<FileChunk>) -> Result<Response<WriteResponse>, Status> {
        let req = request.into_inner();
        let status = self.ops.write(req.inode, req.offset as u64, &req.payload).await.map_err(|e| self.status(e))?;
        Ok(Response::new(WriteResponse { status }))
    }

    #[instrument(skip(self, request))]
    async fn remove(&self, request: Request<DirEnt>) -> Result<Response<WriteResponse>, Status> {
        let req = request.into_inner();
        self.ops.remove(req.parent, &req.name).await.map_err(|e| self.status(e))?;
        Ok(Response::new(WriteResponse { status: crate::fsops::STATUS_OK }))
    }

    #[instrument(skip(self, request))]
    async fn lookup(&self, request: Request<LookupRequest>) -> Result<Response<DirEnt>, Status> {
        let req = request.into_inner();
        let found = self.ops.lookup(req.parent, &req.name).await.map_err(|e| self.status(e))?;
        let (name, attr) = match found {
            Some((name, attr)) => (name, to_wire_attr(attr)),
            None => (String::new(), zero_attr()),
        };
        Ok(Response::new(DirEnt { name, parent: req.parent, attr: Some(attr) }))
    }

    #[instrument(skip(self, request))]
    async fn read_dir_all(&self, request: Request<Node>) -> Result<Response<DirEntries>, Status> {
        let inode = request.into_inner().inode;
        let listing = self.ops.readdir(inode).await.map_err(|e| self.status(e))?;
        let to_entry = |parent: u64| {
            move |e: crate::fsops::dir::DirEntry| DirEnt {
                name: e.name,
                parent,
                attr: Some(to_wire_attr(e.attr)),
            }
        };
        Ok(Response::new(DirEntries {
            dirs: listing.dirs.into_iter().map(to_entry(inode)).collect(),
            files: listing.files.into_iter().map(to_entry(inode)).collect(),
        }))
    }

    #[instrument(skip(self, request))]
    async fn rename(&self, request: Request<RenameRequest>) -> Result<Response<RenameResponse>, Status> {
        let req = request.into_inner();
        self.ops.rename(req.old_parent, &req.old_name, req.new_parent, &req.new_name).await.map_err(|e| self.status(e))?;
        Ok(Response::new(RenameResponse { status: crate::fsops::STATUS_OK }))
    }

    #[instrument(skip(self, request))]
    async fn symlink(&self, request: Request<SymlinkRequest>) -> Result<Response<DirEnt>, Status> {
        let req = request.into_inner();
        let attr = self.ops.symlink(req.parent, &req.name, &req.target).await.map_err(|e| self.status(e))?;
        Ok(Response::new(DirEnt { name: req.name, parent: req.parent, attr: Some(to_wire_attr(attr)) }))
    }

    #[instrument(skip(self, request))]
    async fn readlink(&self, request: Request<Node>) -> Result<Response<ReadlinkResponse>, Status> {
        let inode = request.into_inner().inode;
        let target = self.ops.readlink(inode).await.map_err(|e| self.status(e))?.unwrap_or_default();
        Ok(Response::new(ReadlinkResponse { target }))
    }

    #[instrument(skip(self, request))]
    async fn getxattr(&self, request: Request<GetxattrRequest>) -> Result<Response<GetxattrResponse>, Status> {
        let req = request.into_inner();
        let xattr = self.ops.getxattr(req.inode, &req.name).await.map_err(|e| self.status(e))?;
        Ok(Response::new(GetxattrResponse { xattr }))
    }

    #[instrument(skip(self, request))]
    async fn setxattr(&self, request: Request<SetxattrRequest>) -> Result<Response<SetxattrResponse>, Status> {
        let req = request.into_inner();
        self.ops.setxattr(req.inode, &req.name, req.xattr).await.map_err(|e| self.status(e))?;
        Ok(Response::new(SetxattrResponse {}))
    }

    #[instrument(skip(self, request))]
    async fn listxattr(&self, request: Request<ListxattrRequest>) -> Result<Response<ListxattrResponse>, Status> {
        let inode = request.into_inner().inode;
        let xattr = self.ops.listxattr(inode).await.map_err(|e| self.status(e))?;
        Ok(Response::new(ListxattrResponse { xattr }))
    }

    #[instrument(skip(self, request))]
    async fn removexattr(
        &self,
        request: Request<RemovexattrRequest>,
    ) -> Result<Response<RemovexattrResponse>, Status> {
        let req = request.into_inner();
        self.ops.removexattr(req.inode, &req.name).await.map_err(|e| self.status(e))?;
        Ok(Response::new(RemovexattrResponse {}))
    }

    #[instrument(skip(self, _request))]
    async fn statfs(&self, _request: Request<StatfsRequest>) -> Result<Response<StatfsResponse>, Status> {
        let s = self.ops.statfs();
        Ok(Response::new(StatfsResponse {
            blocks: s.blocks,
            bfree: s.bfree,
            bavail: s.bavail,
            files: s.files,
            ffree: s.ffree,
            bsize: s.bsize,
            namelen: s.namelen,
            frsize: s.frsize,
        }))
    }
}
