use std::io::Cursor;

use suppaftp::types::FileType;
use suppaftp::FtpStream;

use super::{Transfer, TransferError, TransferRequest};

/// Stores the payload with a single `STOR`; an existing remote file is
/// handled however the server handles it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FtpTransfer;

impl Transfer for FtpTransfer {
    fn store(&self, request: &TransferRequest) -> Result<(), TransferError> {
        let endpoint = request.endpoint();
        tracing::debug!(host = %endpoint.host, port = endpoint.port, "connecting to ftp server");
        let mut stream = FtpStream::connect((endpoint.host.as_str(), endpoint.port))?;
        stream.login(endpoint.login.as_str(), endpoint.password.as_str())?;
        stream.transfer_type(FileType::Binary)?;
        if !endpoint.remote_dir.is_empty() {
            stream.cwd(endpoint.remote_dir.as_str())?;
        }

        let mut reader = Cursor::new(request.payload());
        let written = stream.put_file(request.file_name(), &mut reader)?;
        tracing::debug!(file_name = request.file_name(), written, "ftp store finished");

        if let Err(err) = stream.quit() {
            tracing::debug!(%err, "ftp quit failed after successful store");
        }
        Ok(())
    }
}
