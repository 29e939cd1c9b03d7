use std::collections::{BTreeMap, HashMap};

use log::warn;

use crate::models::verdict::{DiseaseClass, ImageRecord, ZoneReport, ZoneVerdict};
use crate::my_utils::io::zone_number;
use crate::my_utils::math::most_common;

/// 整个批次结束后按区域多数表决
///
/// 区域按名称排序，区域内平局取先出现的类别，调用方需保证图片顺序稳定
pub fn aggregate_zones<'a, I>(verdicts: I) -> Vec<ZoneVerdict>
where
    I: IntoIterator<Item = (&'a str, DiseaseClass)>,
{
    let mut groups: BTreeMap<&str, Vec<DiseaseClass>> = BTreeMap::new();
    for (zone, class) in verdicts {
        groups.entry(zone).or_default().push(class);
    }
    groups
        .into_iter()
        .filter_map(|(zone, classes)| {
            most_common(classes).map(|class| ZoneVerdict {
                zone_name: zone.to_string(),
                current_disease: class.name().to_string(),
            })
        })
        .collect()
}

impl ZoneReport {
    pub fn new(zones: Vec<ZoneVerdict>) -> Self {
        ZoneReport { zones }
    }

    /// 区域编号到周期 id 的映射，接口按上报顺序返回 id
    pub fn period_ids_by_zone_number(&self, period_ids: &[String]) -> HashMap<String, String> {
        if period_ids.len() != self.zones.len() {
            warn!("got {} period ids for {} zones", period_ids.len(), self.zones.len());
        }
        self.zones
            .iter()
            .zip(period_ids)
            .filter_map(|(zone, id)| zone_number(&zone.zone_name).map(|n| (n.to_string(), id.clone())))
            .collect()
    }
}

/// 按图片所在区域填写 `period_of_disease_id`，没有区域的保持为空
pub fn attach_period_ids(
    records: &mut [(Option<String>, ImageRecord)],
    period_by_zone_number: &HashMap<String, String>,
) {
    for (zone, record) in records.iter_mut() {
        record.period_of_disease_id = zone
            .as_deref()
            .and_then(zone_number)
            .and_then(|n| period_by_zone_number.get(n).cloned());
    }
}
