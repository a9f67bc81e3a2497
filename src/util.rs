//! Small formatting helpers shared by the commands

/// Human-readable byte size (`1.5 MB`).
pub fn format_size(bytes: u64) -> String {
   const KB: u64 = 1024;
   const MB: u64 = KB * 1024;
   const GB: u64 = MB * 1024;

   if bytes < KB {
      format!("{bytes} B")
   } else if bytes < MB {
      format!("{:.1} KB", bytes as f64 / KB as f64)
   } else if bytes < GB {
      format!("{:.1} MB", bytes as f64 / MB as f64)
   } else {
      format!("{:.1} GB", bytes as f64 / GB as f64)
   }
}

/// `used / total (pct%)` for a byte budget.
pub fn format_usage(used: u64, total: u64) -> String {
   let pct = if total == 0 { 0.0 } else { used as f64 * 100.0 / total as f64 };
   format!("{} / {} ({pct:.0}%)", format_size(used), format_size(total))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn sizes_pick_the_largest_whole_unit() {
      assert_eq!(format_size(512), "512 B");
      assert_eq!(format_size(1536), "1.5 KB");
      assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
   }

   #[test]
   fn usage_handles_zero_capacity() {
      assert_eq!(format_usage(10, 0), "10 B / 0 B (0%)");
      assert_eq!(format_usage(512, 1024), "512 B / 1.0 KB (50%)");
   }
}
