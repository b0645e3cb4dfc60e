//! AWS SDK client initialisation for the upstream S3 endpoint.

use aws_config::{BehaviorVersion, Region};

/// Bundle of AWS SDK clients used by the proxy.
///
/// Credentials are resolved once through the standard AWS credential chain of
/// the proxy's own process environment.
#[derive(Clone, Debug)]
pub struct AwsClients {
    /// S3 client used for intercepted GetObject and PutObject calls.
    pub s3: aws_sdk_s3::Client,
}

impl AwsClients {
    /// Initialise the SDK clients bound to `region`.
    pub async fn init(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;

        Self {
            s3: aws_sdk_s3::Client::new(&config),
        }
    }
}
