//! Process-level statistics.

/// Resident set size of the current process in bytes
///
/// Read from `/proc/self/status`; `None` on platforms without procfs.
pub fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(value * 1024),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        // テスト項目: VmRSS 行の kB 値がバイトに変換される
        // given (前提条件):
        let status = "Name:\troomrelay\nVmPeak:\t  20480 kB\nVmRSS:\t   5120 kB\nThreads:\t4\n";

        // when (操作):
        let rss = parse_vm_rss(status);

        // then (期待する結果):
        assert_eq!(rss, Some(5120 * 1024));
    }

    #[test]
    fn test_parse_vm_rss_missing_line() {
        // テスト項目: VmRSS 行がなければ None
        // given (前提条件):
        let status = "Name:\tkthreadd\nThreads:\t1\n";

        // when (操作) / then (期待する結果):
        assert_eq!(parse_vm_rss(status), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_resident_memory_of_running_process() {
        // テスト項目: Linux では実行中のプロセスの RSS が取得できる
        // when (操作):
        let rss = resident_memory_bytes();

        // then (期待する結果):
        assert!(rss.is_some_and(|bytes| bytes > 0));
    }
}
