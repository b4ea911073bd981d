use crate::devices::{DEVICE_PRESETS, DeviceProfile};
use crate::output::{self, TableBuilder, text};
use crate::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DeviceList {
    pub devices: Vec<DeviceProfile>,
}

impl output::OutputFormatter for DeviceList {
    fn format_text(&self) -> String {
        let mut table = TableBuilder::new().headers(vec![
            "Name".into(),
            "Viewport".into(),
            "Scale".into(),
            "Mobile".into(),
            "Touch".into(),
        ]);

        for device in &self.devices {
            let v = &device.viewport;
            table = table.row(vec![
                device.name.clone(),
                format!("{}x{}", v.width, v.height),
                format!("{}x", v.scale_factor),
                v.is_mobile.to_string(),
                v.has_touch.to_string(),
            ]);
        }

        format!("{}\n{}", text::section("Device presets"), table.build())
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(&self.devices, pretty)
    }
}

pub fn handle_devices() -> DeviceList {
    DeviceList {
        devices: DEVICE_PRESETS.clone(),
    }
}
