pub mod http_upload;
