//! Tabular rendering for `discover clusters` (spec §6): one tab-separated
//! row per cluster, id/master IP/zone.

pub fn render_cluster_row(cluster_id: &str, master_ip: &str, region: &str) -> String {
    format!("{cluster_id}\t{master_ip}\t{region}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_is_tab_separated_with_no_trailing_tab() {
        let row = render_cluster_row("kubernetes", "203.0.113.9", "us-east-1");
        assert_eq!(row, "kubernetes\t203.0.113.9\tus-east-1");
        assert_eq!(row.matches('\t').count(), 2);
    }
}
