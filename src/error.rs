use thiserror::Error;

pub type Result<T> = std::result::Result<T, GteamError>;

#[derive(Error, Debug)]
pub enum GteamError {
    #[error("Git error: {0}")]
    Git(#[from] Box<gix::open::Error>),
    #[error("Git command failed: {0}")]
    GitCommand(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Snapshot error: {0}")]
    Snapshot(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
}

// gix errors are large; keep the enum small by boxing them on conversion
impl From<gix::open::Error> for GteamError {
    fn from(err: gix::open::Error) -> Self {
        GteamError::Git(Box::new(err))
    }
}

impl From<gix::object::find::existing::Error> for GteamError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        GteamError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for GteamError {
    fn from(err: gix::object::commit::Error) -> Self {
        GteamError::Commit(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for GteamError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        GteamError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for GteamError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        GteamError::HeadPeel(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for GteamError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        GteamError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for GteamError {
    fn from(err: gix::objs::decode::Error) -> Self {
        GteamError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for GteamError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        GteamError::DiffTreeToTree(Box::new(err))
    }
}

impl From<gix::discover::Error> for GteamError {
    fn from(err: gix::discover::Error) -> Self {
        GteamError::GitDiscover(Box::new(err))
    }
}
