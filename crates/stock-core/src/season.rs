//! 季節日曆模型

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ForecastError;

/// 季節（每季三個月）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    /// 所有季節
    pub const ALL: [Season; 4] = [Season::Summer, Season::Autumn, Season::Winter, Season::Spring];

    /// 英文名稱
    pub fn name(&self) -> &'static str {
        match self {
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
            Season::Spring => "Spring",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Season {
    type Err = ForecastError;

    /// 接受英文名稱與倉庫系統原有的西班牙文名稱（不分大小寫）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summer" | "verano" => Ok(Season::Summer),
            "autumn" | "fall" | "otoño" | "otono" => Ok(Season::Autumn),
            "winter" | "invierno" => Ok(Season::Winter),
            "spring" | "primavera" => Ok(Season::Spring),
            other => Err(ForecastError::InvalidConfig(format!("未知的季節: {other}"))),
        }
    }
}

/// 季節日曆（月份 → 季節）
///
/// 索引 0 = 一月, 1 = 二月, ..., 11 = 十二月
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    /// 日曆ID
    pub calendar_id: String,

    /// 每個月份所屬的季節
    pub months: [Season; 12],
}

impl SeasonCalendar {
    /// 南半球日曆（預設）：夏 = 12/1/2 月，秋 = 3/4/5 月，冬 = 6/7/8 月，春 = 9/10/11 月
    pub fn southern_hemisphere() -> Self {
        use Season::*;
        Self {
            calendar_id: "SOUTHERN".to_string(),
            months: [
                Summer, Summer, Autumn, Autumn, Autumn, Winter, Winter, Winter, Spring, Spring,
                Spring, Summer,
            ],
        }
    }

    /// 北半球日曆
    pub fn northern_hemisphere() -> Self {
        use Season::*;
        Self {
            calendar_id: "NORTHERN".to_string(),
            months: [
                Winter, Winter, Spring, Spring, Spring, Summer, Summer, Summer, Autumn, Autumn,
                Autumn, Winter,
            ],
        }
    }

    /// 建構器模式：自訂月份對應
    pub fn with_months(mut self, calendar_id: String, months: [Season; 12]) -> Self {
        self.calendar_id = calendar_id;
        self.months = months;
        self
    }

    /// 月份（1-12）所屬的季節，超出範圍回傳 None
    pub fn season_of(&self, month: u32) -> Option<Season> {
        if (1..=12).contains(&month) {
            Some(self.months[(month - 1) as usize])
        } else {
            None
        }
    }

    /// 日期所屬的季節
    pub fn season_of_date(&self, date: NaiveDate) -> Season {
        // month() 一定落在 1..=12
        self.months[date.month0() as usize]
    }

    /// 季節包含的月份（1-12，遞增）
    pub fn months_of(&self, season: Season) -> Vec<u32> {
        self.months
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == season)
            .map(|(i, _)| i as u32 + 1)
            .collect()
    }

    /// 檢查日期是否落在指定季節
    pub fn contains(&self, season: Season, date: NaiveDate) -> bool {
        self.season_of_date(date) == season
    }
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        Self::southern_hemisphere()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_custom_month_table() {
        use Season::*;
        let calendar = SeasonCalendar::default().with_months(
            "TROPICAL".to_string(),
            [
                Summer, Summer, Summer, Summer, Summer, Summer, Winter, Winter, Winter, Winter,
                Winter, Winter,
            ],
        );

        assert_eq!(calendar.calendar_id, "TROPICAL");
        assert_eq!(calendar.season_of(3), Some(Summer));
        assert_eq!(calendar.season_of(7), Some(Winter));
        assert!(calendar.months_of(Autumn).is_empty());
        assert_eq!(calendar.months_of(Winter), vec![7, 8, 9, 10, 11, 12]);
    }

    #[rstest]
    #[case(12, Season::Summer)]
    #[case(1, Season::Summer)]
    #[case(2, Season::Summer)]
    #[case(3, Season::Autumn)]
    #[case(5, Season::Autumn)]
    #[case(6, Season::Winter)]
    #[case(8, Season::Winter)]
    #[case(9, Season::Spring)]
    #[case(11, Season::Spring)]
    fn test_southern_mapping(#[case] month: u32, #[case] expected: Season) {
        let calendar = SeasonCalendar::southern_hemisphere();
        assert_eq!(calendar.season_of(month), Some(expected));
    }

    #[test]
    fn test_out_of_range_month() {
        let calendar = SeasonCalendar::default();
        assert_eq!(calendar.season_of(0), None);
        assert_eq!(calendar.season_of(13), None);
    }

    #[test]
    fn test_months_of_season() {
        let calendar = SeasonCalendar::southern_hemisphere();
        assert_eq!(calendar.months_of(Season::Summer), vec![1, 2, 12]);
        assert_eq!(calendar.months_of(Season::Winter), vec![6, 7, 8]);

        // 每個月份剛好屬於一個季節
        let total: usize = Season::ALL.iter().map(|s| calendar.months_of(*s).len()).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn test_northern_calendar_swaps_seasons() {
        let calendar = SeasonCalendar::northern_hemisphere();
        let january = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert!(calendar.contains(Season::Winter, january));
        assert!(!SeasonCalendar::default().contains(Season::Winter, january));
    }

    #[rstest]
    #[case("Summer", Season::Summer)]
    #[case("verano", Season::Summer)]
    #[case("Otoño", Season::Autumn)]
    #[case("INVIERNO", Season::Winter)]
    #[case(" spring ", Season::Spring)]
    fn test_parse_season(#[case] raw: &str, #[case] expected: Season) {
        assert_eq!(raw.parse::<Season>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_season() {
        assert!(matches!(
            "monsoon".parse::<Season>(),
            Err(ForecastError::InvalidConfig(_))
        ));
    }
}
