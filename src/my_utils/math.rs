use std::collections::HashMap;
use std::hash::Hash;

/// 最大值的下标和值，相同时取第一个，忽略 NaN
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

/// 统计每个值出现的次数
pub fn bincount<T: Eq + Hash + Copy>(values: impl IntoIterator<Item = T>) -> HashMap<T, usize> {
    let mut counts = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
}

/// 出现次数最多的值，次数相同取先出现的
pub fn most_common<T: Eq + Hash + Copy>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut order: Vec<T> = Vec::new();
    let mut counts: HashMap<T, usize> = HashMap::new();
    for v in values {
        let count = counts.entry(v).or_insert(0);
        if *count == 0 {
            order.push(v);
        }
        *count += 1;
    }
    let mut best: Option<(T, usize)> = None;
    for v in order {
        let c = counts[&v];
        match best {
            Some((_, b)) if c <= b => {}
            _ => best = Some((v, c)),
        }
    }
    best.map(|(v, _)| v)
}

/// 宽高比 w / h，高为 0 时返回 0
pub fn aspect_ratio(w: u32, h: u32) -> f64 {
    if h == 0 {
        return 0.0;
    }
    w as f64 / h as f64
}
