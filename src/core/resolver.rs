//! Device role resolution.
//!
//! Works out which attached device is "the keyboard" and which is "the
//! trackpad", either up front from known hardware descriptors or on the fly
//! from the first events each class produces. Roles are assigned once and
//! never change afterwards.

use crate::driver::{DeviceDirectory, DeviceId, Subscription};
use std::fmt;
use tracing::info;

/// A role the filter tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Keyboard,
    Trackpad,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Keyboard => write!(f, "keyboard"),
            Role::Trackpad => write!(f, "trackpad"),
        }
    }
}

/// Devices assigned to each role so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roles {
    pub keyboard: Option<DeviceId>,
    pub trackpad: Option<DeviceId>,
}

impl Roles {
    /// Role held by a device. The keyboard role wins if one device holds both.
    pub fn role_of(&self, device: DeviceId) -> Option<Role> {
        if self.keyboard == Some(device) {
            Some(Role::Keyboard)
        } else if self.trackpad == Some(device) {
            Some(Role::Trackpad)
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.keyboard.is_some() && self.trackpad.is_some()
    }
}

/// Resolves and remembers the keyboard and trackpad roles.
#[derive(Debug, Clone, Default)]
pub struct DeviceResolver {
    roles: Roles,
}

impl DeviceResolver {
    /// Start with no roles; they are learned from incoming events.
    pub fn discovering() -> Self {
        Self::default()
    }

    /// Resolve both roles by exact descriptor match against every attached
    /// device. The first device matching each descriptor takes the role.
    pub fn from_descriptors<D: DeviceDirectory + ?Sized>(
        directory: &D,
        keyboard: &str,
        trackpad: &str,
    ) -> Result<Self, ResolveError> {
        let mut roles = Roles::default();

        for device in directory.device_ids() {
            let Some(hardware_id) = directory.hardware_id(device) else {
                continue;
            };

            if roles.keyboard.is_none() && hardware_id == keyboard {
                info!(%device, %hardware_id, "Found keyboard");
                roles.keyboard = Some(device);
            }
            if roles.trackpad.is_none() && hardware_id == trackpad {
                info!(%device, %hardware_id, "Found trackpad");
                roles.trackpad = Some(device);
            }
        }

        if roles.trackpad.is_none() {
            return Err(ResolveError::NotFound {
                role: Role::Trackpad,
                descriptor: trackpad.to_string(),
            });
        }
        if roles.keyboard.is_none() {
            return Err(ResolveError::NotFound {
                role: Role::Keyboard,
                descriptor: keyboard.to_string(),
            });
        }

        Ok(Self { roles })
    }

    pub fn roles(&self) -> Roles {
        self.roles
    }

    pub fn is_resolved(&self) -> bool {
        self.roles.is_complete()
    }

    /// Subscription matching what is known: exactly the two devices once
    /// both roles are set, every keyboard and pointer otherwise.
    pub fn subscription(&self) -> Subscription {
        match (self.roles.keyboard, self.roles.trackpad) {
            (Some(keyboard), Some(trackpad)) => Subscription::narrowed(keyboard, trackpad),
            _ => Subscription::broad(),
        }
    }

    /// Learn from an event's source device.
    ///
    /// The pointer predicate is checked first, so a compound device that
    /// reports both classes becomes the trackpad if that role is still open.
    /// A device holding one role is never given the other.
    ///
    /// Returns the narrowed subscription on the observation that completes
    /// resolution, and `None` on every other call. Applying it is up to the
    /// caller.
    pub fn observe<D: DeviceDirectory + ?Sized>(
        &mut self,
        directory: &D,
        device: DeviceId,
    ) -> Option<Subscription> {
        if self.roles.is_complete() || self.roles.role_of(device).is_some() {
            return None;
        }

        if self.roles.trackpad.is_none() && directory.is_pointer(device) {
            info!(%device, "Found trackpad");
            self.roles.trackpad = Some(device);
        } else if self.roles.keyboard.is_none() && directory.is_keyboard(device) {
            info!(%device, "Found keyboard");
            self.roles.keyboard = Some(device);
        } else {
            return None;
        }

        self.roles.is_complete().then(|| self.subscription())
    }
}

/// Startup resolution failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No attached device carries the expected descriptor
    NotFound { role: Role, descriptor: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound { role, descriptor } => {
                write!(f, "No attached device matches the {role} hardware id {descriptor:?}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DeviceSelector;
    use std::collections::HashMap;

    /// Directory with Interception-style numbering: keyboards below 11.
    #[derive(Default)]
    struct FakeDirectory {
        hardware_ids: HashMap<u16, String>,
        compound: Vec<u16>,
    }

    impl FakeDirectory {
        fn with(ids: &[(u16, &str)]) -> Self {
            Self {
                hardware_ids: ids.iter().map(|(id, hw)| (*id, hw.to_string())).collect(),
                compound: Vec::new(),
            }
        }
    }

    impl DeviceDirectory for FakeDirectory {
        fn device_ids(&self) -> Vec<DeviceId> {
            (1..=20).map(DeviceId).collect()
        }

        fn hardware_id(&self, device: DeviceId) -> Option<String> {
            self.hardware_ids
                .get(&device.0)
                .filter(|hw| !hw.is_empty())
                .cloned()
        }

        fn is_keyboard(&self, device: DeviceId) -> bool {
            (1..=10).contains(&device.0) || self.compound.contains(&device.0)
        }

        fn is_pointer(&self, device: DeviceId) -> bool {
            (11..=20).contains(&device.0) || self.compound.contains(&device.0)
        }
    }

    #[test]
    fn test_resolve_by_descriptor() {
        let directory = FakeDirectory::with(&[
            (1, "ACPI\\VEN_ATML&DEV_1000"),
            (2, "HID\\VID_046D&PID_C31C"),
            (11, "HID\\VID_046D&PID_C077"),
            (12, "HID\\VID_04F3&PID_3125"),
        ]);

        let resolver = DeviceResolver::from_descriptors(
            &directory,
            "HID\\VID_046D&PID_C31C",
            "HID\\VID_04F3&PID_3125",
        )
        .unwrap();

        assert!(resolver.is_resolved());
        assert_eq!(resolver.roles().keyboard, Some(DeviceId(2)));
        assert_eq!(resolver.roles().trackpad, Some(DeviceId(12)));
        assert_eq!(
            resolver.subscription(),
            Subscription::narrowed(DeviceId(2), DeviceId(12))
        );
    }

    #[test]
    fn test_descriptor_match_is_exact() {
        let directory = FakeDirectory::with(&[(1, "HID\\VID_046D"), (11, "HID\\VID_04F3")]);

        let err = DeviceResolver::from_descriptors(&directory, "hid\\vid_046d", "HID\\VID_04F3")
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::NotFound {
                role: Role::Keyboard,
                descriptor: "hid\\vid_046d".to_string(),
            }
        );

        let err = DeviceResolver::from_descriptors(&directory, "HID\\VID_046D", "HID\\VID_04F")
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::NotFound {
                role: Role::Trackpad,
                ..
            }
        ));
        assert!(err.to_string().contains("trackpad"));
    }

    #[test]
    fn test_empty_descriptor_never_matches() {
        let directory = FakeDirectory::with(&[(1, ""), (11, "HID\\VID_04F3")]);
        let result = DeviceResolver::from_descriptors(&directory, "", "HID\\VID_04F3");
        assert!(result.is_err());
    }

    #[test]
    fn test_first_matching_device_wins() {
        let directory = FakeDirectory::with(&[(3, "KBD"), (4, "KBD"), (11, "PAD")]);
        let resolver = DeviceResolver::from_descriptors(&directory, "KBD", "PAD").unwrap();
        assert_eq!(resolver.roles().keyboard, Some(DeviceId(3)));
    }

    #[test]
    fn test_progressive_inference() {
        let directory = FakeDirectory::default();
        let mut resolver = DeviceResolver::discovering();
        assert_eq!(resolver.subscription(), Subscription::broad());

        assert_eq!(resolver.observe(&directory, DeviceId(1)), None);
        assert_eq!(resolver.roles().keyboard, Some(DeviceId(1)));
        assert!(!resolver.is_resolved());

        // Another keyboard does not take over
        assert_eq!(resolver.observe(&directory, DeviceId(2)), None);
        assert_eq!(resolver.roles().keyboard, Some(DeviceId(1)));

        let narrowed = resolver.observe(&directory, DeviceId(11)).unwrap();
        assert_eq!(narrowed.keyboards, DeviceSelector::Only(DeviceId(1)));
        assert_eq!(narrowed.pointers, DeviceSelector::Only(DeviceId(11)));
    }

    #[test]
    fn test_narrowing_fires_once() {
        let directory = FakeDirectory::default();
        let mut resolver = DeviceResolver::discovering();

        let fired: Vec<_> = [11, 12, 1, 11, 1, 2, 13]
            .into_iter()
            .filter_map(|id| resolver.observe(&directory, DeviceId(id)))
            .collect();

        assert_eq!(fired, vec![Subscription::narrowed(DeviceId(1), DeviceId(11))]);
    }

    #[test]
    fn test_roles_are_monotonic() {
        let directory = FakeDirectory::default();
        let mut resolver = DeviceResolver::discovering();
        resolver.observe(&directory, DeviceId(5));
        resolver.observe(&directory, DeviceId(17));
        let settled = resolver.roles();

        for id in 1..=20 {
            resolver.observe(&directory, DeviceId(id));
            assert_eq!(resolver.roles(), settled);
        }

        // Descriptor-resolved roles never move either
        let directory = FakeDirectory::with(&[(1, "KBD"), (11, "PAD")]);
        let mut resolver = DeviceResolver::from_descriptors(&directory, "KBD", "PAD").unwrap();
        for id in 1..=20 {
            assert_eq!(resolver.observe(&directory, DeviceId(id)), None);
        }
        assert_eq!(resolver.roles().keyboard, Some(DeviceId(1)));
        assert_eq!(resolver.roles().trackpad, Some(DeviceId(11)));
    }

    #[test]
    fn test_compound_device_classified_as_pointer_first() {
        let directory = FakeDirectory {
            compound: vec![3],
            ..FakeDirectory::default()
        };
        let mut resolver = DeviceResolver::discovering();

        resolver.observe(&directory, DeviceId(3));
        assert_eq!(resolver.roles().trackpad, Some(DeviceId(3)));
        assert_eq!(resolver.roles().keyboard, None);

        // Seeing it again does not hand it the keyboard role as well
        resolver.observe(&directory, DeviceId(3));
        assert_eq!(resolver.roles().keyboard, None);

        resolver.observe(&directory, DeviceId(1));
        assert_eq!(resolver.roles().keyboard, Some(DeviceId(1)));
    }

    #[test]
    fn test_unclassified_device_ignored() {
        struct Empty;
        impl DeviceDirectory for Empty {
            fn device_ids(&self) -> Vec<DeviceId> {
                Vec::new()
            }
            fn hardware_id(&self, _: DeviceId) -> Option<String> {
                None
            }
            fn is_keyboard(&self, _: DeviceId) -> bool {
                false
            }
            fn is_pointer(&self, _: DeviceId) -> bool {
                false
            }
        }

        let mut resolver = DeviceResolver::discovering();
        assert_eq!(resolver.observe(&Empty, DeviceId(4)), None);
        assert_eq!(resolver.roles(), Roles::default());
    }
}
