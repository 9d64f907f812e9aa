//! Tag-sentinel relocation for ElasticIP.
//!
//! An AWS Elastic IP allocation cannot itself carry tags, so the allocation
//! is instead located by a tag written onto some other resource that *can*
//! be tagged (the master's root volume, in `kubeup-compose`'s ordering).
//! Grounded verbatim on `elastic_ip.go`'s `find`/`RenderAWS`: probe the
//! sentinel tag first, fall back to allocating only if it's absent, then
//! write the allocated address's public IP back onto the sentinel tag.

use crate::adapter::{CloudAdapter, ElasticIpInfo, Tags};
use crate::error::CloudError;

/// Mirrors `ElasticIP.find`: resolve via the tag on `sentinel_resource_id`
/// before ever calling `DescribeAddresses` with no filter (which would
/// return every address in the account).
pub async fn find_elastic_ip_via_sentinel(
    adapter: &dyn CloudAdapter,
    sentinel_resource_id: &str,
    tag_key: &str,
) -> Result<Option<ElasticIpInfo>, CloudError> {
    let tags = adapter.get_tags(sentinel_resource_id).await?;
    let Some(public_ip) = tags.get(tag_key) else {
        return Ok(None);
    };
    adapter.find_elastic_ip_by_allocation_id(public_ip).await
}

/// Mirrors `ElasticIP.RenderAWS`: allocate only if genuinely absent, then
/// stamp the sentinel tag so a later `find` on the same cluster locates it
/// without leaking a second, orphaned allocation.
pub async fn ensure_elastic_ip(
    adapter: &dyn CloudAdapter,
    sentinel_resource_id: &str,
    tag_key: &str,
) -> Result<ElasticIpInfo, CloudError> {
    if let Some(existing) = find_elastic_ip_via_sentinel(adapter, sentinel_resource_id, tag_key).await? {
        return Ok(existing);
    }
    let allocated = adapter.allocate_elastic_ip().await?;
    let mut tag = Tags::new();
    tag.insert(tag_key.to_string(), allocated.public_ip.clone());
    adapter.create_tags(sentinel_resource_id, &tag).await?;
    Ok(allocated)
}

/// Splits the desired tag set against the actual one into tags that must be
/// added and tags whose value changed — the primitive `kubeup-units`' tag
/// handling composes into each resource's `checkChanges`.
pub fn diff_tags(actual: &Tags, desired: &Tags) -> Tags {
    desired
        .iter()
        .filter(|(k, v)| actual.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_tags_only_includes_changed_or_missing() {
        let actual = Tags::from([("Name".to_string(), "old".to_string()), ("kept".to_string(), "v".to_string())]);
        let desired = Tags::from([
            ("Name".to_string(), "new".to_string()),
            ("kept".to_string(), "v".to_string()),
            ("added".to_string(), "v2".to_string()),
        ]);
        let diff = diff_tags(&actual, &desired);
        assert_eq!(diff.get("Name").map(String::as_str), Some("new"));
        assert_eq!(diff.get("added").map(String::as_str), Some("v2"));
        assert!(!diff.contains_key("kept"));
    }
}
