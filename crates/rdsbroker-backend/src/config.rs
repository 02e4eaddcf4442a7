/// Build an `SdkConfig` for `region` from the default credential chain.
///
/// `endpoint_url` points the SDK at something other than the public AWS
/// endpoint (a local fake, a VPC endpoint).
pub async fn build_sdk_config(region: &str, endpoint_url: Option<&str>) -> aws_config::SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    if let Some(url) = endpoint_url {
        builder = builder.endpoint_url(url);
    }

    builder.load().await
}
