use std::collections::{HashMap, HashSet};

use eframe::egui::Color32;

pub const CATEGORY10: [Color32; 10] = [
    Color32::from_rgb(31, 119, 180),
    Color32::from_rgb(255, 127, 14),
    Color32::from_rgb(44, 160, 44),
    Color32::from_rgb(214, 39, 40),
    Color32::from_rgb(148, 103, 189),
    Color32::from_rgb(140, 86, 75),
    Color32::from_rgb(227, 119, 194),
    Color32::from_rgb(127, 127, 127),
    Color32::from_rgb(188, 189, 34),
    Color32::from_rgb(23, 190, 207),
];

const UNASSIGNED: Color32 = Color32::from_rgb(110, 118, 129);

#[derive(Debug, Default)]
pub struct FlowPalette {
    slots: HashMap<String, usize>,
}

impl FlowPalette {
    pub fn sync<'a>(&mut self, flow_ids: impl IntoIterator<Item = &'a str>) {
        let ids = flow_ids.into_iter().collect::<Vec<_>>();
        let alive = ids.iter().copied().collect::<HashSet<_>>();
        self.slots.retain(|id, _| alive.contains(id.as_str()));

        for id in ids {
            if self.slots.contains_key(id) {
                continue;
            }

            let mut usage = [0usize; CATEGORY10.len()];
            for slot in self.slots.values() {
                usage[*slot % CATEGORY10.len()] += 1;
            }
            // Least-used slot, lowest index first.
            let slot = (0..CATEGORY10.len())
                .min_by_key(|slot| (usage[*slot], *slot))
                .unwrap_or(0);
            self.slots.insert(id.to_owned(), slot);
        }
    }

    pub fn color(&self, flow_id: &str) -> Color32 {
        self.slots
            .get(flow_id)
            .map(|slot| CATEGORY10[*slot % CATEGORY10.len()])
            .unwrap_or(UNASSIGNED)
    }
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}
