//! S3-Compatible Storage Client
//!
//! Talks to AWS S3 or any S3-compatible object store (Aliyun OSS, MinIO,
//! R2, ...) through `aws-sdk-s3`, blocking on a private runtime.

use crate::client::{
    BucketMeta, HttpMethod, ListOptions, ListingPage, ObjectMeta, ObjectRecord, StorageClient,
};
use crate::error::StoreError;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime, DateTimeFormat};
use aws_sdk_s3::types::{Delete, Grant, ObjectCannedAcl, ObjectIdentifier, Permission};
use aws_sdk_s3::Client;
use bucketfs_core::{Config, UrlOptions, Visibility, WriteReceipt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

const ALL_USERS: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// Largest batch a single DeleteObjects request accepts.
const DELETE_BATCH: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3ClientConfig {
    /// Custom endpoint, e.g. `https://oss-cn-hangzhou.aliyuncs.com`.
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub force_path_style: bool,
    /// Overrides the derived bucket request URL (CDN or custom domain).
    pub public_base_url: Option<String>,
}

impl S3ClientConfig {
    /// Reads `BUCKETFS_S3_ENDPOINT`, `BUCKETFS_S3_REGION`,
    /// `BUCKETFS_S3_PATH_STYLE` and `BUCKETFS_PUBLIC_URL`. Credentials come
    /// from the usual AWS environment.
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var("BUCKETFS_S3_ENDPOINT").ok(),
            region: std::env::var("BUCKETFS_S3_REGION").ok(),
            force_path_style: std::env::var("BUCKETFS_S3_PATH_STYLE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            public_base_url: std::env::var("BUCKETFS_PUBLIC_URL").ok(),
        }
    }

    /// Base URL objects of `bucket` are publicly reachable at.
    pub fn request_url(&self, bucket: &str, region: Option<&str>) -> String {
        if let Some(base) = &self.public_base_url {
            return base.trim_end_matches('/').to_string();
        }
        match &self.endpoint_url {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                match endpoint.split_once("://") {
                    Some((scheme, host)) if !self.force_path_style => {
                        format!("{scheme}://{bucket}.{host}")
                    }
                    _ => format!("{endpoint}/{bucket}"),
                }
            }
            None => format!(
                "https://{bucket}.s3.{}.amazonaws.com",
                region.unwrap_or("us-east-1")
            ),
        }
    }
}

fn provider<E: std::error::Error + ProvideErrorMetadata>(e: E) -> StoreError {
    classify(e.code(), DisplayErrorContext(&e).to_string())
}

/// Map an S3 error code onto the store error surface.
fn classify(code: Option<&str>, message: String) -> StoreError {
    match code {
        Some(
            "AccessDenied" | "AllAccessDisabled" | "InvalidAccessKeyId" | "SignatureDoesNotMatch",
        ) => StoreError::PermissionDenied(message),
        _ => StoreError::Provider(message),
    }
}

fn format_time(time: &DateTime, format: DateTimeFormat) -> Result<String, StoreError> {
    time.fmt(format)
        .map_err(|e| StoreError::MalformedResponse(e.to_string()))
}

fn canned_acl(visibility: Visibility) -> ObjectCannedAcl {
    match visibility {
        Visibility::PublicRead => ObjectCannedAcl::PublicRead,
        Visibility::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
        // S3 objects have no inherit-from-bucket ACL; private is its default.
        Visibility::Private | Visibility::Default => ObjectCannedAcl::Private,
    }
}

/// Fold ACL grants back into the closest canned ACL.
fn visibility_from_grants(grants: &[Grant]) -> Visibility {
    let public: Vec<&Permission> = grants
        .iter()
        .filter(|grant| grant.grantee().and_then(|g| g.uri()) == Some(ALL_USERS))
        .filter_map(|grant| grant.permission())
        .collect();

    if public
        .iter()
        .any(|p| matches!(p, Permission::Write | Permission::FullControl))
    {
        Visibility::PublicReadWrite
    } else if public.iter().any(|p| matches!(p, Permission::Read)) {
        Visibility::PublicRead
    } else {
        Visibility::Private
    }
}

/// S3-compatible storage client.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    config: S3ClientConfig,
    runtime: Arc<Runtime>,
}

impl S3Client {
    pub fn new(config: S3ClientConfig) -> Result<Self, StoreError> {
        let runtime = Runtime::new().map_err(|e| StoreError::Configuration(e.to_string()))?;

        let client = runtime.block_on(async {
            let mut loader = aws_config::from_env();
            if let Some(endpoint) = &config.endpoint_url {
                loader = loader.endpoint_url(endpoint);
            }
            if let Some(region) = &config.region {
                loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
            }
            let shared = loader.load().await;
            let s3_config = aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(config.force_path_style)
                .build();
            Client::from_conf(s3_config)
        });

        Ok(Self {
            client,
            config,
            runtime: Arc::new(runtime),
        })
    }

    pub fn from_env() -> Result<Self, StoreError> {
        Self::new(S3ClientConfig::from_env())
    }

    pub fn config(&self) -> &S3ClientConfig {
        &self.config
    }

    fn run_async<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        self.runtime.block_on(fut)
    }

    async fn put_bytes(
        &self,
        bucket: &str,
        key: &str,
        contents: Vec<u8>,
        options: &Config,
    ) -> Result<WriteReceipt, StoreError> {
        let mut req = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(contents))
            .set_content_type(options.content_type.clone())
            .set_cache_control(options.cache_control.clone())
            .set_content_disposition(options.content_disposition.clone());
        if let Some(visibility) = options.visibility.filter(|v| *v != Visibility::Default) {
            req = req.acl(canned_acl(visibility));
        }
        for (name, value) in &options.metadata {
            req = req.metadata(name, value);
        }

        let resp = req.send().await.map_err(provider)?;
        Ok(WriteReceipt {
            etag: resp.e_tag().map(str::to_string),
        })
    }
}

impl StorageClient for S3Client {
    fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage, StoreError> {
        let max_keys = i32::try_from(options.max_keys).unwrap_or(i32::MAX);
        let token = Some(options.marker.clone()).filter(|m| !m.is_empty());

        self.run_async(async {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(&options.prefix)
                .delimiter(&options.delimiter)
                .max_keys(max_keys)
                .set_continuation_token(token)
                .send()
                .await
                .map_err(provider)?;

            let mut objects = Vec::with_capacity(resp.contents().len());
            for object in resp.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                let last_modified = object.last_modified().ok_or_else(|| {
                    StoreError::MalformedResponse(format!("{key} has no last-modified time"))
                })?;
                objects.push(ObjectRecord {
                    key: key.to_string(),
                    last_modified: format_time(last_modified, DateTimeFormat::DateTime)?,
                    size: object.size().unwrap_or(0).max(0) as u64,
                });
            }

            let common_prefixes = resp
                .common_prefixes()
                .iter()
                .filter_map(|p| p.prefix().map(str::to_string))
                .collect();

            Ok(ListingPage {
                objects,
                common_prefixes,
                next_marker: resp.next_continuation_token().map(str::to_string),
            })
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        contents: &[u8],
        options: &Config,
    ) -> Result<WriteReceipt, StoreError> {
        self.run_async(self.put_bytes(bucket, key, contents.to_vec(), options))
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.run_async(async {
            let resp = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        StoreError::NotFound(format!("{bucket}/{key}"))
                    } else {
                        provider(service_err)
                    }
                })?;
            let body = resp
                .body
                .collect()
                .await
                .map_err(|e| StoreError::Network(e.to_string()))?;
            Ok(body.into_bytes().to_vec())
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.run_async(async {
            self.client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(provider)?;
            Ok(())
        })
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        self.run_async(async {
            for chunk in keys.chunks(DELETE_BATCH) {
                let objects = chunk
                    .iter()
                    .map(|key| {
                        ObjectIdentifier::builder()
                            .key(key)
                            .build()
                            .map_err(|e| StoreError::InvalidPath(e.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let delete = Delete::builder()
                    .set_objects(Some(objects))
                    .quiet(true)
                    .build()
                    .map_err(|e| StoreError::InvalidPath(e.to_string()))?;

                debug!(bucket, count = chunk.len(), "delete objects batch");
                self.client
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(provider)?;
            }
            Ok(())
        })
    }

    fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> Result<(), StoreError> {
        let copy_source = format!("{from_bucket}/{from_key}");
        self.run_async(async {
            self.client
                .copy_object()
                .bucket(to_bucket)
                .copy_source(copy_source)
                .key(to_key)
                .send()
                .await
                .map_err(provider)?;
            Ok(())
        })
    }

    fn does_object_exist(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        self.run_async(async {
            match self
                .client
                .head_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_not_found() {
                        Ok(false)
                    } else {
                        Err(provider(service_err))
                    }
                }
            }
        })
    }

    fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        self.run_async(async {
            let resp = self
                .client
                .head_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_not_found() {
                        StoreError::NotFound(format!("{bucket}/{key}"))
                    } else {
                        provider(service_err)
                    }
                })?;

            let last_modified = resp.last_modified().ok_or_else(|| {
                StoreError::MalformedResponse(format!("{key} has no last-modified time"))
            })?;

            Ok(ObjectMeta {
                last_modified: format_time(last_modified, DateTimeFormat::HttpDate)?,
                content_type: resp.content_type().map(str::to_string),
                content_length: resp.content_length().unwrap_or(0).max(0) as u64,
                etag: resp.e_tag().map(str::to_string),
            })
        })
    }

    fn get_object_acl(&self, bucket: &str, key: &str) -> Result<Visibility, StoreError> {
        self.run_async(async {
            let resp = self
                .client
                .get_object_acl()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(provider)?;
            Ok(visibility_from_grants(resp.grants()))
        })
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: Visibility) -> Result<(), StoreError> {
        self.run_async(async {
            self.client
                .put_object_acl()
                .bucket(bucket)
                .key(key)
                .acl(canned_acl(acl))
                .send()
                .await
                .map_err(provider)?;
            Ok(())
        })
    }

    fn get_bucket_acl(&self, bucket: &str) -> Result<Visibility, StoreError> {
        self.run_async(async {
            let resp = self
                .client
                .get_bucket_acl()
                .bucket(bucket)
                .send()
                .await
                .map_err(provider)?;
            Ok(visibility_from_grants(resp.grants()))
        })
    }

    fn get_bucket_meta(&self, bucket: &str) -> Result<BucketMeta, StoreError> {
        self.run_async(async {
            self.client
                .head_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(provider)?;
            Ok(())
        })?;

        let region = self.client.config().region().map(|r| r.to_string());
        Ok(BucketMeta {
            request_url: self.config.request_url(bucket, region.as_deref()),
            region,
        })
    }

    fn create_object_dir(
        &self,
        bucket: &str,
        key: &str,
        options: &Config,
    ) -> Result<(), StoreError> {
        let key = format!("{}/", key.trim_end_matches('/'));
        self.run_async(self.put_bytes(bucket, &key, Vec::new(), options))
            .map(|_| ())
    }

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        timeout: Duration,
        method: HttpMethod,
        options: &UrlOptions,
    ) -> Result<String, StoreError> {
        let presigning =
            PresigningConfig::expires_in(timeout).map_err(|e| StoreError::Configuration(e.to_string()))?;

        self.run_async(async {
            let request = match method {
                HttpMethod::Get => self
                    .client
                    .get_object()
                    .bucket(bucket)
                    .key(key)
                    .set_response_content_type(options.response_content_type.clone())
                    .set_response_content_disposition(options.response_content_disposition.clone())
                    .presigned(presigning)
                    .await
                    .map_err(provider)?,
                HttpMethod::Put => self
                    .client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .presigned(presigning)
                    .await
                    .map_err(provider)?,
            };
            Ok(request.uri().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::types::{Grantee, Type};

    fn public_grant(permission: Permission) -> Grant {
        Grant::builder()
            .grantee(
                Grantee::builder()
                    .r#type(Type::Group)
                    .uri(ALL_USERS)
                    .build()
                    .unwrap(),
            )
            .permission(permission)
            .build()
    }

    #[test]
    fn test_request_url_virtual_hosted() {
        let config = S3ClientConfig {
            endpoint_url: Some("https://oss-cn-hangzhou.aliyuncs.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.request_url("media", None),
            "https://media.oss-cn-hangzhou.aliyuncs.com"
        );
    }

    #[test]
    fn test_request_url_path_style_and_aws_default() {
        let config = S3ClientConfig {
            endpoint_url: Some("http://localhost:9000".to_string()),
            force_path_style: true,
            ..Default::default()
        };
        assert_eq!(config.request_url("media", None), "http://localhost:9000/media");

        let aws = S3ClientConfig::default();
        assert_eq!(
            aws.request_url("media", Some("eu-west-1")),
            "https://media.s3.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn test_public_base_url_wins() {
        let config = S3ClientConfig {
            endpoint_url: Some("https://s3.example.com".to_string()),
            public_base_url: Some("https://cdn.example.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.request_url("media", None), "https://cdn.example.com");
    }

    #[test]
    fn test_access_errors_map_to_permission_denied() {
        assert!(matches!(
            classify(Some("AccessDenied"), "denied".to_string()),
            StoreError::PermissionDenied(m) if m == "denied"
        ));
        assert!(matches!(
            classify(Some("SignatureDoesNotMatch"), String::new()),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify(Some("SlowDown"), String::new()),
            StoreError::Provider(_)
        ));
        assert!(matches!(classify(None, String::new()), StoreError::Provider(_)));
    }

    #[test]
    fn test_visibility_from_grants() {
        assert_eq!(visibility_from_grants(&[]), Visibility::Private);
        assert_eq!(
            visibility_from_grants(&[public_grant(Permission::Read)]),
            Visibility::PublicRead
        );
        assert_eq!(
            visibility_from_grants(&[
                public_grant(Permission::Read),
                public_grant(Permission::Write)
            ]),
            Visibility::PublicReadWrite
        );
    }
}
