// OSS module - resource canonicalization and request signing for Aliyun OSS

pub mod presign;
pub mod resource;
pub mod signer;
pub mod subresource;

pub use presign::presigned_url;
pub use resource::{
    canonical_sub_resource, decode_path, escape_object_path, split_bucket_path, Resource,
};
pub use signer::{
    create_string_to_sign, http_date, Clock, OssSigner, RequestSigner, SignerConfig, CONTENT_MD5,
};
pub use subresource::{is_signed_sub_resource, SIGNED_SUB_RESOURCES};
