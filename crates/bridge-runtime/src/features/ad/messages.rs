//! AdService wire messages.

use hb_01_wire_codec::{DecodeError, Field, Message, Reader, Writer};

/// Request for both LoadAd and ShowAd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdRequest {
    pub ad_group_id: String,
}

impl AdRequest {
    pub fn new(ad_group_id: impl Into<String>) -> Self {
        Self {
            ad_group_id: ad_group_id.into(),
        }
    }
}

impl Message for AdRequest {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.ad_group_id.is_empty() {
            w.write_string(1, &self.ad_group_id);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.ad_group_id = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

/// Details reported when an ad finished loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdLoaded {
    pub response_id: String,
    pub ad_network_class_name: String,
}

impl Message for AdLoaded {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.response_id.is_empty() {
            w.write_string(1, &self.response_id);
        }
        if !self.ad_network_class_name.is_empty() {
            w.write_string(2, &self.ad_network_class_name);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.response_id = r.read_string(field)?.to_owned(),
            2 => self.ad_network_class_name = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

/// Reward granted by a rewarded ad.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdReward {
    pub unit_type: String,
    pub unit_amount: i32,
}

impl Message for AdReward {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.unit_type.is_empty() {
            w.write_string(1, &self.unit_type);
        }
        if self.unit_amount != 0 {
            w.write_int32(2, self.unit_amount);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.unit_type = r.read_string(field)?.to_owned(),
            2 => self.unit_amount = r.read_int32(field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadAdEventKind {
    Loaded(AdLoaded),
    Clicked,
    Dismissed,
    FailedToShow,
    Impression,
    Show,
}

/// One event of a LoadAd operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadAdEvent {
    pub kind: Option<LoadAdEventKind>,
}

impl LoadAdEvent {
    pub fn new(kind: LoadAdEventKind) -> Self {
        Self { kind: Some(kind) }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            Some(LoadAdEventKind::Dismissed | LoadAdEventKind::FailedToShow)
        )
    }
}

impl Message for LoadAdEvent {
    fn encode_raw(&self, w: &mut Writer) {
        match &self.kind {
            Some(LoadAdEventKind::Loaded(data)) => w.write_message(1, data),
            Some(LoadAdEventKind::Clicked) => w.write_message(2, &()),
            Some(LoadAdEventKind::Dismissed) => w.write_message(3, &()),
            Some(LoadAdEventKind::FailedToShow) => w.write_message(4, &()),
            Some(LoadAdEventKind::Impression) => w.write_message(5, &()),
            Some(LoadAdEventKind::Show) => w.write_message(6, &()),
            None => {}
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        let kind = match field.number {
            1 => LoadAdEventKind::Loaded(r.read_message(field)?),
            2..=6 => {
                r.read_message::<()>(field)?;
                match field.number {
                    2 => LoadAdEventKind::Clicked,
                    3 => LoadAdEventKind::Dismissed,
                    4 => LoadAdEventKind::FailedToShow,
                    5 => LoadAdEventKind::Impression,
                    _ => LoadAdEventKind::Show,
                }
            }
            _ => return r.skip(field),
        };
        self.kind = Some(kind);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowAdEventKind {
    Requested,
    Clicked,
    Dismissed,
    FailedToShow,
    Impression,
    Show,
    UserEarnedReward(AdReward),
}

/// One event of a ShowAd operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowAdEvent {
    pub kind: Option<ShowAdEventKind>,
}

impl ShowAdEvent {
    pub fn new(kind: ShowAdEventKind) -> Self {
        Self { kind: Some(kind) }
    }

    /// Dismissed and failed-to-show end the flow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            Some(ShowAdEventKind::Dismissed | ShowAdEventKind::FailedToShow)
        )
    }
}

impl Message for ShowAdEvent {
    fn encode_raw(&self, w: &mut Writer) {
        match &self.kind {
            Some(ShowAdEventKind::Requested) => w.write_message(1, &()),
            Some(ShowAdEventKind::Clicked) => w.write_message(2, &()),
            Some(ShowAdEventKind::Dismissed) => w.write_message(3, &()),
            Some(ShowAdEventKind::FailedToShow) => w.write_message(4, &()),
            Some(ShowAdEventKind::Impression) => w.write_message(5, &()),
            Some(ShowAdEventKind::Show) => w.write_message(6, &()),
            Some(ShowAdEventKind::UserEarnedReward(reward)) => w.write_message(7, reward),
            None => {}
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        let kind = match field.number {
            7 => ShowAdEventKind::UserEarnedReward(r.read_message(field)?),
            1..=6 => {
                r.read_message::<()>(field)?;
                match field.number {
                    1 => ShowAdEventKind::Requested,
                    2 => ShowAdEventKind::Clicked,
                    3 => ShowAdEventKind::Dismissed,
                    4 => ShowAdEventKind::FailedToShow,
                    5 => ShowAdEventKind::Impression,
                    _ => ShowAdEventKind::Show,
                }
            }
            _ => return r.skip(field),
        };
        self.kind = Some(kind);
        Ok(())
    }
}
