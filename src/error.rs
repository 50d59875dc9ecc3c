//! Recoverable editor errors.
//!
//! Every variant is reported to the user as a status notification; none of
//! them terminate the editor. Operations that return one of these leave the
//! graph exactly as it was.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::graph::model::NodeId;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("No active node.")]
    NoActiveNode,

    #[error("Base node cannot be deleted.")]
    RootNodeProtected,

    #[error("Root element cannot be an edge target.")]
    TargetIsRoot,

    #[error("There is already an edge between these two nodes.")]
    EdgeAlreadyExists,

    #[error("A node cannot be connected to itself.")]
    SelfLoop,

    #[error("There is no edge between these two nodes.")]
    NoSuchEdge,

    #[error("Unknown node {0}.")]
    UnknownNode(NodeId),

    #[error("No node number starts with the typed digits.")]
    HintNoMatch,

    #[error("Couldn't read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't parse {}: {message}", path.display())]
    FileParse { path: PathBuf, message: String },

    #[error("Couldn't write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
