//! HTTP Boundary Adapter
//!
//! Translates the external HTTP surface into [`NodeService`] calls and maps
//! [`ChordError`] onto status codes. This is the only layer that formats
//! errors for the wire, and the only place filenames are validated before
//! they reach routing or storage.

use axum::extract::{DefaultBodyLimit, Extension, Multipart, Path};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use std::sync::Arc;

use super::node_service::NodeService;
use super::ChordError;
use crate::chord::node::NodeInfo;
use crate::transport::protocol::{
    AckResponse, ErrorResponse, FileDeleteResponse, FileListResponse, FileUploadResponse,
    FindSuccessorRequest, FindSuccessorResponse, JoinRequest, JoinResponse, NodeInfoResponse,
    NotifyRequest, PredecessorResponse, TransferFile, TransferRequest, TransferResponse,
    ENDPOINT_FILES, ENDPOINT_FORWARD, ENDPOINT_INFO, ENDPOINT_JOIN, ENDPOINT_KEEPALIVE,
    ENDPOINT_LOCAL_FILES, ENDPOINT_NOTIFY, ENDPOINT_PREDECESSOR, ENDPOINT_SUCCESSOR,
    ENDPOINT_TRANSFER,
};

/// Names that would shadow the static file routes.
const RESERVED_NAMES: [&str; 3] = ["forward", "transfer", "local"];

/// Build the full HTTP surface of one node.
pub fn router(service: Arc<NodeService>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(ENDPOINT_SUCCESSOR, post(find_successor))
        .route(ENDPOINT_PREDECESSOR, get(get_predecessor))
        .route(ENDPOINT_JOIN, post(join))
        .route(ENDPOINT_NOTIFY, post(notify))
        .route(ENDPOINT_KEEPALIVE, post(keepalive))
        .route(ENDPOINT_INFO, get(node_info))
        .route(ENDPOINT_FILES, post(upload_file).get(list_files))
        .route(ENDPOINT_FORWARD, post(forward_file))
        .route(ENDPOINT_TRANSFER, post(transfer_files))
        .route(
            &format!("{}/:filename", ENDPOINT_LOCAL_FILES),
            get(get_local_file).delete(delete_local_file),
        )
        .route(
            &format!("{}/:filename", ENDPOINT_FILES),
            get(download_file).delete(delete_file),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(Extension(service))
}

fn status_for(error: &ChordError) -> StatusCode {
    match error {
        ChordError::NotFound => StatusCode::NOT_FOUND,
        ChordError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ChordError::Transport(_) => StatusCode::BAD_GATEWAY,
        ChordError::AlreadyBootstrapped => StatusCode::CONFLICT,
        ChordError::Storage(_) | ChordError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: ChordError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Reject anything that could escape the flat storage directory or collide
/// with the static file routes.
fn sanitize_filename(raw: &str) -> Result<String, ChordError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ChordError::InvalidArgument(
            "no filename provided".to_string(),
        ));
    }
    let pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,254}$").unwrap();
    if !pattern.is_match(name) {
        return Err(ChordError::InvalidArgument(format!(
            "invalid filename: {}",
            raw
        )));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(ChordError::InvalidArgument(format!(
            "reserved filename: {}",
            name
        )));
    }
    Ok(name.to_string())
}

fn validate_id(service: &NodeService, id: u64) -> Result<(), ChordError> {
    if id >= service.ring_size() {
        return Err(ChordError::InvalidArgument(format!(
            "id {} outside ring of size {}",
            id,
            service.ring_size()
        )));
    }
    Ok(())
}

/// Pull the first file field out of a multipart body.
async fn read_multipart_file(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ChordError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChordError::InvalidArgument(format!("malformed multipart body: {}", e)))?
    {
        let Some(raw_name) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        let filename = sanitize_filename(&raw_name)?;
        let content = field
            .bytes()
            .await
            .map_err(|e| ChordError::InvalidArgument(format!("failed to read upload: {}", e)))?;
        return Ok((filename, content.to_vec()));
    }
    Err(ChordError::InvalidArgument(
        "no file provided".to_string(),
    ))
}

// --- Chord protocol handlers ---

async fn find_successor(
    Extension(service): Extension<Arc<NodeService>>,
    Json(request): Json<FindSuccessorRequest>,
) -> Response {
    if let Err(e) = validate_id(&service, request.id) {
        return error_response(e);
    }
    match service.route_step(request.id) {
        Ok(next) => {
            tracing::debug!(
                "Routing step for key {} from {} -> {}",
                request.id,
                request.requester,
                next
            );
            Json(FindSuccessorResponse {
                successor_id: next.id,
                successor_addr: next.address,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn get_predecessor(Extension(service): Extension<Arc<NodeService>>) -> Response {
    match service.predecessor() {
        Ok(predecessor) => {
            let (predecessor_id, predecessor_addr) = match predecessor {
                Some(peer) => (Some(peer.id), Some(peer.address)),
                None => (None, None),
            };
            Json(PredecessorResponse {
                predecessor_id,
                predecessor_addr,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn join(
    Extension(service): Extension<Arc<NodeService>>,
    Json(request): Json<JoinRequest>,
) -> Response {
    if let Err(e) = validate_id(&service, request.id) {
        return error_response(e);
    }
    if request.address.trim().is_empty() {
        return error_response(ChordError::InvalidArgument(
            "joining node has no address".to_string(),
        ));
    }
    let joiner = NodeInfo {
        id: request.id,
        address: request.address,
    };
    match service.handle_join(joiner).await {
        Ok(successor) => Json(JoinResponse {
            successor_id: successor.id,
            successor_addr: successor.address,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn notify(
    Extension(service): Extension<Arc<NodeService>>,
    Json(request): Json<NotifyRequest>,
) -> Response {
    if let Err(e) = validate_id(&service, request.predecessor_id) {
        return error_response(e);
    }
    let candidate = NodeInfo {
        id: request.predecessor_id,
        address: request.predecessor_addr,
    };
    // Acknowledged whether or not the pointer moved; re-notifying with the
    // current predecessor is a no-op.
    match service.handle_notify(candidate) {
        Ok(_) => Json(AckResponse {
            message: "ACK".to_string(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn keepalive() -> Json<AckResponse> {
    Json(AckResponse {
        message: "alive".to_string(),
    })
}

async fn node_info(Extension(service): Extension<Arc<NodeService>>) -> Response {
    match service.snapshot() {
        Ok(snapshot) => {
            let (predecessor_id, predecessor_addr) = match snapshot.predecessor {
                Some(peer) => (Some(peer.id), Some(peer.address)),
                None => (None, None),
            };
            Json(NodeInfoResponse {
                id: snapshot.info.id,
                address: snapshot.info.address,
                successor_id: snapshot.successor.id,
                successor_addr: snapshot.successor.address,
                predecessor_id,
                predecessor_addr,
                finger_table: snapshot.finger_ids,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

// --- File handlers ---

async fn upload_file(
    Extension(service): Extension<Arc<NodeService>>,
    mut multipart: Multipart,
) -> Response {
    let (filename, content) = match read_multipart_file(&mut multipart).await {
        Ok(file) => file,
        Err(e) => return error_response(e),
    };
    match service.save_file(&filename, content).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(FileUploadResponse {
                message: format!("File {} uploaded successfully.", filename),
                filename,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_files(Extension(service): Extension<Arc<NodeService>>) -> Response {
    match service.list_files().await {
        Ok(files) => Json(FileListResponse { files }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn download_file(
    Extension(service): Extension<Arc<NodeService>>,
    Path(filename): Path<String>,
) -> Response {
    let filename = match sanitize_filename(&filename) {
        Ok(name) => name,
        Err(e) => return error_response(e),
    };
    match service.fetch_file(&filename).await {
        Ok(content) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            content,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_file(
    Extension(service): Extension<Arc<NodeService>>,
    Path(filename): Path<String>,
) -> Response {
    let filename = match sanitize_filename(&filename) {
        Ok(name) => name,
        Err(e) => return error_response(e),
    };
    match service.remove_file(&filename).await {
        Ok(()) => Json(FileDeleteResponse {
            message: format!("File {} deleted successfully.", filename),
            filename,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn forward_file(
    Extension(service): Extension<Arc<NodeService>>,
    mut multipart: Multipart,
) -> Response {
    let (filename, content) = match read_multipart_file(&mut multipart).await {
        Ok(file) => file,
        Err(e) => return error_response(e),
    };
    match service.store_forwarded(&filename, &content).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(FileUploadResponse {
                message: "File stored successfully.".to_string(),
                filename,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn transfer_files(
    Extension(service): Extension<Arc<NodeService>>,
    Json(request): Json<TransferRequest>,
) -> Response {
    if let Err(e) = validate_id(&service, request.lo).and_then(|_| validate_id(&service, request.hi))
    {
        return error_response(e);
    }
    match service.handle_transfer(request.lo, request.hi).await {
        Ok(files) => {
            let files = files
                .into_iter()
                .map(|(filename, content)| TransferFile {
                    filename,
                    content: STANDARD.encode(content),
                })
                .collect();
            Json(TransferResponse { files }).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn get_local_file(
    Extension(service): Extension<Arc<NodeService>>,
    Path(filename): Path<String>,
) -> Response {
    let filename = match sanitize_filename(&filename) {
        Ok(name) => name,
        Err(e) => return error_response(e),
    };
    match service.local_file(&filename).await {
        Ok(Some(content)) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            content,
        )
            .into_response(),
        Ok(None) => error_response(ChordError::NotFound),
        Err(e) => error_response(e),
    }
}

async fn delete_local_file(
    Extension(service): Extension<Arc<NodeService>>,
    Path(filename): Path<String>,
) -> Response {
    let filename = match sanitize_filename(&filename) {
        Ok(name) => name,
        Err(e) => return error_response(e),
    };
    match service.delete_local_file(&filename).await {
        Ok(true) => Json(FileDeleteResponse {
            message: format!("File {} deleted successfully.", filename),
            filename,
        })
        .into_response(),
        Ok(false) => error_response(ChordError::NotFound),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_filename;

    #[test]
    fn test_sanitize_accepts_plain_names() {
        assert_eq!(
            sanitize_filename("report-2024.txt").unwrap(),
            "report-2024.txt"
        );
        assert_eq!(sanitize_filename(" padded.txt ").unwrap(), "padded.txt");
        assert_eq!(sanitize_filename("a").unwrap(), "a");
    }

    #[test]
    fn test_sanitize_rejects_traversal_and_separators() {
        for bad in [
            "",
            "..",
            "../etc/passwd",
            "a/b.txt",
            "a\\b.txt",
            ".hidden",
            "name with spaces",
        ] {
            assert!(sanitize_filename(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_sanitize_rejects_reserved_route_names() {
        for bad in ["forward", "transfer", "local"] {
            assert!(sanitize_filename(bad).is_err(), "{:?} should be rejected", bad);
        }
    }
}
