//! The broadcast session state machine.

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use stagecast_protocol::{
    audio_encoding, video_encoding, Command, Envelope, InitSettings, MediaKind,
    NegotiationPayload, Notification, NotificationBus, Preset, Ratio, SessionDescription,
    SessionEvent, SessionState, SettingChange,
};
use stagecast_transport::ChannelHandle;

use crate::config::{BroadcasterConfig, Generation, StartFailure, StartInfo, StartOptions};
use crate::device::{LocalMedia, MediaDevice};
use crate::error::{SessionError, ValidationError};
use crate::registry::{StreamEndpoint, StreamRegistry};

/// One-shot outcome callbacks for an in-flight start.
struct PendingStart {
    success: Option<crate::config::StartSuccessFn>,
    error: Option<crate::config::StartErrorFn>,
}

/// An offer awaiting its correlated answer.
struct Negotiation {
    media: LocalMedia,
}

/// Owns one broadcaster session's lifecycle.
///
/// Commands go out through the channel handle; acknowledgements come back
/// through the bus and are correlated by action name, never arrival order.
/// Settings mutate only once the remote end confirms them.
pub struct Broadcaster {
    config: BroadcasterConfig,
    state: SessionState,
    video: stagecast_protocol::VideoSettings,
    audio: stagecast_protocol::AudioSettings,
    connected: bool,
    authorized: bool,
    remote_version: Option<String>,
    endpoint: Option<StreamEndpoint>,

    channel: ChannelHandle,
    bus: NotificationBus,
    events: Receiver<Notification>,
    device: Box<dyn MediaDevice>,
    registry: Option<Box<dyn StreamRegistry>>,

    // Second leg of the video quality sequence, sent only after the
    // quality ack arrives.
    pending_quality: Option<(MediaKind, Preset)>,
    pending_fps: Option<u32>,

    // A stop issued while Starting runs once Started is reached, so
    // commands never cross in flight.
    pending_stop: bool,
    pending_start: Option<PendingStart>,
    negotiation: Option<Negotiation>,

    next_message_id: u64,
}

impl Broadcaster {
    /// Create a session around the shared channel and bus.
    ///
    /// Settings are cloned out of the config into fresh owned values; no
    /// defaults are shared between instances.
    pub fn new(
        config: BroadcasterConfig,
        channel: ChannelHandle,
        bus: NotificationBus,
        device: Box<dyn MediaDevice>,
    ) -> Self {
        let events = bus.subscribe();
        let video = config.video.clone();
        let audio = config.audio.clone();
        Self {
            config,
            state: SessionState::Uninitialized,
            video,
            audio,
            connected: false,
            authorized: false,
            remote_version: None,
            endpoint: None,
            channel,
            bus,
            events,
            device,
            registry: None,
            pending_quality: None,
            pending_fps: None,
            pending_stop: false,
            pending_start: None,
            negotiation: None,
            next_message_id: 0,
        }
    }

    /// Attach a stream registry for endpoint allocation.
    pub fn with_registry(mut self, registry: Box<dyn StreamRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn video(&self) -> &stagecast_protocol::VideoSettings {
        &self.video
    }

    pub fn audio(&self) -> &stagecast_protocol::AudioSettings {
        &self.audio
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Whether the session is connected to the media server.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn endpoint(&self) -> Option<&StreamEndpoint> {
        self.endpoint.as_ref()
    }

    /// Drain bus notifications, feeding inbound channel messages into the
    /// state machine.
    pub fn poll(&mut self) {
        while let Ok(notification) = self.events.try_recv() {
            if let Notification::Channel(envelope) = notification {
                self.handle_message(&envelope);
            }
        }
    }

    /// Request the remote capture component load.
    ///
    /// Requires a resolved render target; the loaded acknowledgement
    /// arrives as a `completed` message once the component is up.
    pub fn open(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Uninitialized {
            return Err(ValidationError::InvalidState {
                operation: "open",
                state: self.state.name(),
            }
            .into());
        }
        if self.config.target.is_none() {
            warn!(id = %self.config.id, "Missing render target, cannot open");
            return Err(ValidationError::MissingTarget.into());
        }

        info!(id = %self.config.id, "Opening broadcaster session");
        self.transition(SessionState::Loading);
        Ok(())
    }

    /// Start camera capture, optionally connecting to a remote endpoint.
    ///
    /// With `connect`, the endpoint is resolved first (caller-supplied
    /// host, else a registry allocation); nothing is sent when no endpoint
    /// can be resolved. The success/error callbacks fire once, on the
    /// outcome.
    pub fn start(&mut self, mut options: StartOptions) -> Result<(), SessionError> {
        if !self.state.can_start() {
            let err = ValidationError::InvalidState {
                operation: "start",
                state: self.state.name(),
            };
            fire_error(&mut options.error, None, err.to_string());
            return Err(err.into());
        }

        if options.connect {
            let endpoint = match self.resolve_endpoint(&mut options) {
                Ok(endpoint) => endpoint,
                Err(e) => return Err(e),
            };
            info!(id = %self.config.id, endpoint = %endpoint.url, "Starting broadcast");
            self.endpoint = Some(endpoint.clone());

            match self.config.generation {
                Generation::Bridge => {
                    self.transition(SessionState::Starting);
                    self.pending_start = Some(PendingStart {
                        success: options.success.take(),
                        error: options.error.take(),
                    });
                    self.send_command(Command::Start { url: Some(endpoint.url) });
                }
                Generation::Native => {
                    self.begin_negotiation(&mut options, endpoint)?;
                }
            }
        } else {
            info!(id = %self.config.id, "Starting local-only capture");
            match self.config.generation {
                Generation::Bridge => {
                    self.transition(SessionState::Starting);
                    self.pending_start = Some(PendingStart {
                        success: options.success.take(),
                        error: options.error.take(),
                    });
                    self.send_command(Command::Start { url: None });
                }
                Generation::Native => {
                    // Local-only capture does not contact the remote
                    // endpoint at all.
                    let media = match self.device.acquire(&self.video, &self.audio) {
                        Ok(media) => media,
                        Err(e) => {
                            warn!(id = %self.config.id, "Device acquisition failed: {}", e);
                            fire_error(&mut options.error, None, e.to_string());
                            return Err(e.into());
                        }
                    };
                    self.authorized = true;
                    self.negotiation = Some(Negotiation { media });
                    self.transition(SessionState::Starting);
                    self.enter_started(None, options.success.take());
                }
            }
        }

        Ok(())
    }

    /// Stop capture and disconnect from the media server.
    ///
    /// While `Starting`, the stop is queued and runs once `Started` is
    /// reached. In any other non-started state this is a no-op.
    pub fn stop(&mut self) {
        match self.state {
            SessionState::Started => {
                info!(id = %self.config.id, "Stopping broadcast");
                if self.audio.loopback {
                    self.send_command(Command::SetLoopback { value: false });
                }
                self.transition(SessionState::Stopping);
                self.send_command(Command::Stop);
            }
            SessionState::Starting => {
                debug!(id = %self.config.id, "Stop queued until start completes");
                self.pending_stop = true;
            }
            _ => {
                debug!(id = %self.config.id, state = %self.state.name(), "Ignoring stop");
            }
        }
    }

    /// Tear the session down and release the render target.
    pub fn destroy(mut self) {
        info!(id = %self.config.id, "Destroying broadcaster session");
        if self.state.is_started() {
            self.stop();
        }
        if let Some(negotiation) = self.negotiation.take() {
            self.device.release(negotiation.media);
        }
        self.config.target = None;
    }

    /// Change the capture quality preset for one media kind.
    ///
    /// Video quality is a two-command sequence: capture quality first,
    /// then the framerate once the quality ack arrives. The two are not
    /// atomic on the remote end and the first is not rolled back if the
    /// second fails.
    pub fn set_quality(&mut self, kind: MediaKind, preset: Preset) -> Result<(), SessionError> {
        self.ensure_started("set_quality")?;

        match kind {
            MediaKind::Video => {
                let encoding = video_encoding(preset);
                self.pending_quality = Some((kind, preset));
                self.pending_fps = Some(encoding.fps);
                self.send_command(Command::SetQuality { kind, value: encoding.quality });
            }
            MediaKind::Audio => {
                self.pending_quality = Some((kind, preset));
                self.send_command(Command::SetQuality { kind, value: audio_encoding(preset) });
            }
        }
        Ok(())
    }

    /// Change the number of frames between key frames.
    pub fn set_key_frame_interval(&mut self, interval: u32) -> Result<(), SessionError> {
        self.ensure_started("set_key_frame_interval")?;
        if interval == 0 {
            return Err(ValidationError::ZeroKeyFrameInterval.into());
        }
        self.send_command(Command::SetKeyFrameInterval { value: interval });
        Ok(())
    }

    /// Change the camera capture ratio.
    pub fn set_ratio(&mut self, ratio: Ratio) -> Result<(), SessionError> {
        self.ensure_started("set_ratio")?;
        self.send_command(Command::SetRatio { value: ratio });
        Ok(())
    }

    /// Change the capture height; width follows from the ratio.
    pub fn set_capture_size(&mut self, height: u32) -> Result<(), SessionError> {
        self.ensure_started("set_capture_size")?;
        if height == 0 {
            return Err(ValidationError::ZeroCaptureSize.into());
        }
        self.send_command(Command::SetCaptureSize { value: height });
        Ok(())
    }

    /// Change the microphone gain, 0-100.
    pub fn set_gain(&mut self, gain: u32) -> Result<(), SessionError> {
        self.ensure_started("set_gain")?;
        if gain > 100 {
            warn!(id = %self.config.id, gain, "Rejecting out-of-range gain");
            return Err(ValidationError::GainOutOfRange(gain).into());
        }
        self.send_command(Command::SetGain { value: gain });
        Ok(())
    }

    /// Activate or deactivate the camera.
    pub fn set_video_active(&mut self, active: bool) -> Result<(), SessionError> {
        self.ensure_started("set_video_active")?;
        self.send_command(Command::SetVideoActive { value: active });
        Ok(())
    }

    /// Mute the microphone.
    pub fn mute(&mut self) -> Result<(), SessionError> {
        self.ensure_started("mute")?;
        self.send_command(Command::Mute);
        Ok(())
    }

    /// Unmute the microphone.
    pub fn unmute(&mut self) -> Result<(), SessionError> {
        self.ensure_started("unmute")?;
        self.send_command(Command::Unmute);
        Ok(())
    }

    /// Mute when the microphone is active, unmute otherwise.
    pub fn toggle_volume(&mut self) -> Result<(), SessionError> {
        if self.audio.active {
            self.mute()
        } else {
            self.unmute()
        }
    }

    /// Enable or disable microphone loopback.
    pub fn set_loopback(&mut self, value: bool) -> Result<(), SessionError> {
        self.ensure_started("set_loopback")?;
        self.send_command(Command::SetLoopback { value });
        Ok(())
    }

    fn ensure_started(&self, operation: &'static str) -> Result<(), ValidationError> {
        if self.state.is_started() {
            Ok(())
        } else {
            Err(ValidationError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }

    fn resolve_endpoint(
        &mut self,
        options: &mut StartOptions,
    ) -> Result<StreamEndpoint, SessionError> {
        if let Some(host) = options.host.take() {
            return Ok(StreamEndpoint { url: host });
        }
        if let Some(endpoint) = self.endpoint.clone() {
            return Ok(endpoint);
        }
        match self.registry.as_mut() {
            Some(registry) => match registry.allocate(options.store) {
                Ok(endpoint) => Ok(endpoint),
                Err(e) => {
                    warn!(id = %self.config.id, "Endpoint allocation failed: {}", e);
                    fire_error(&mut options.error, None, e.to_string());
                    Err(e.into())
                }
            },
            None => {
                warn!(id = %self.config.id, "No stream registry and no host supplied");
                let err = ValidationError::NoEndpoint;
                fire_error(&mut options.error, None, err.to_string());
                Err(err.into())
            }
        }
    }

    fn begin_negotiation(
        &mut self,
        options: &mut StartOptions,
        endpoint: StreamEndpoint,
    ) -> Result<(), SessionError> {
        let media = match self.device.acquire(&self.video, &self.audio) {
            Ok(media) => media,
            Err(e) => {
                warn!(id = %self.config.id, "Device acquisition failed: {}", e);
                fire_error(&mut options.error, None, e.to_string());
                return Err(e.into());
            }
        };
        let offer = match self.device.create_offer(&media) {
            Ok(offer) => offer,
            Err(e) => {
                warn!(id = %self.config.id, "Offer construction failed: {}", e);
                self.device.release(media);
                fire_error(&mut options.error, None, e.to_string());
                return Err(e.into());
            }
        };

        self.authorized = true;
        self.transition(SessionState::Starting);
        self.pending_start = Some(PendingStart {
            success: options.success.take(),
            error: options.error.take(),
        });
        self.negotiation = Some(Negotiation { media });
        self.send_command(Command::Dispatch(NegotiationPayload {
            to: endpoint.url,
            session: self.config.id.clone(),
            description: offer,
        }));
        Ok(())
    }

    /// Feed one inbound channel message into the state machine.
    pub fn handle_message(&mut self, envelope: &Envelope) {
        match envelope.action.as_str() {
            "completed" => self.on_completed(envelope),
            "init" => self.on_init(envelope),
            "start" => self.on_start(envelope),
            "stop" => self.on_stop(envelope),
            "connect" => self.on_connect(envelope),
            "authorize" => self.on_authorize(envelope),
            "set_quality" => self.on_set_quality(envelope),
            "set_fps" => self.on_set_fps(envelope),
            "set_key_frame_interval" => self.on_set_key_frame_interval(envelope),
            "set_ratio" => self.on_set_ratio(envelope),
            "set_capture_size" => self.on_set_capture_size(envelope),
            "set_gain" => self.on_set_gain(envelope),
            "set_video_active" => self.on_set_video_active(envelope),
            "mute" => self.on_mute(envelope),
            "unmute" => self.on_unmute(envelope),
            "set_loopback" => self.on_set_loopback(envelope),
            "mic_activity" => self.on_mic_activity(envelope),
            "set_image" | "hide_image" => self.on_image(envelope),
            "answer" => self.on_answer(envelope),
            "candidate" => self.on_candidate(envelope),
            other => {
                debug!(id = %self.config.id, action = %other, "Ignoring unhandled action");
            }
        }
    }

    fn on_completed(&mut self, envelope: &Envelope) {
        if self.state != SessionState::Loading {
            debug!(id = %self.config.id, state = %self.state.name(), "Ignoring completed");
            return;
        }

        let version = envelope.str_field("version").unwrap_or("").to_string();
        if version != self.config.protocol_version {
            warn!(
                id = %self.config.id,
                remote = %version,
                expected = %self.config.protocol_version,
                "Remote component version is not compatible"
            );
            self.transition(SessionState::Failed);
            self.publish(SessionEvent::Incompatible {
                id: self.config.id.clone(),
                version,
            });
            return;
        }

        info!(id = %self.config.id, version = %version, "Remote component loaded");
        self.remote_version = Some(version);

        // Resolve presets into concrete wire parameters for the init push.
        let video = video_encoding(self.video.quality);
        let audio = audio_encoding(self.audio.quality);
        self.video.fps = video.fps;

        self.transition(SessionState::Initialized);
        self.send_command(Command::Init(InitSettings {
            video_quality: video.quality,
            audio_quality: audio,
            fps: video.fps,
            ratio: self.video.ratio,
            capture_size: self.video.capture_height,
            gain: self.audio.gain,
            video_active: self.video.active,
            image: self.config.image.clone(),
        }));
    }

    fn on_init(&mut self, envelope: &Envelope) {
        if self.state != SessionState::Initialized {
            debug!(id = %self.config.id, state = %self.state.name(), "Ignoring init ack");
            return;
        }

        let ack = envelope.ack();
        if ack.ok {
            info!(id = %self.config.id, "Session initialized");
            self.publish(SessionEvent::Ready {
                id: self.config.id.clone(),
                version: self.remote_version.clone().unwrap_or_default(),
            });

            if self.config.connect {
                if let Err(e) = self.start(StartOptions::connect()) {
                    warn!(id = %self.config.id, "Auto-start failed: {}", e);
                }
            }
        } else {
            warn!(
                id = %self.config.id,
                code = ?ack.error,
                "Initialization failed: {}",
                ack.message()
            );
            self.transition(SessionState::Failed);
            self.publish(SessionEvent::InitFailed {
                id: self.config.id.clone(),
                code: ack.error,
                message: ack.message(),
            });
        }
    }

    fn on_start(&mut self, envelope: &Envelope) {
        if self.state != SessionState::Starting {
            debug!(id = %self.config.id, state = %self.state.name(), "Ignoring start ack");
            return;
        }

        let ack = envelope.ack();
        if ack.ok {
            self.authorized = envelope.bool_field("authorized").unwrap_or(false);
            if let Ok(active) = envelope.bool_field("video_active") {
                self.video.active = active;
            }
            info!(
                id = %self.config.id,
                authorized = self.authorized,
                "Broadcast started; camera/microphone access is {}",
                if self.authorized { "authorized" } else { "refused" }
            );

            if self.audio.loopback {
                self.send_command(Command::SetLoopback { value: true });
            }
            self.sync_placeholder();

            let endpoint = self.endpoint.as_ref().map(|e| e.url.clone());
            let success = self.pending_start.take().and_then(|mut p| p.success.take());
            self.enter_started(endpoint, success);
        } else {
            warn!(
                id = %self.config.id,
                code = ?ack.error,
                "Could not start broadcast: {}",
                ack.message()
            );
            self.transition(SessionState::Failed);
            self.publish(SessionEvent::Failed {
                id: self.config.id.clone(),
                code: ack.error,
                message: ack.message(),
            });
            if let Some(mut pending) = self.pending_start.take() {
                fire_error(&mut pending.error, ack.error, ack.message());
            }
            self.pending_stop = false;
        }
    }

    fn enter_started(
        &mut self,
        endpoint: Option<String>,
        success: Option<crate::config::StartSuccessFn>,
    ) {
        self.transition(SessionState::Started);
        self.publish(SessionEvent::Started {
            id: self.config.id.clone(),
            authorized: self.authorized,
            video_active: self.video.active,
        });
        if let Some(callback) = success {
            callback(StartInfo {
                endpoint,
                video_active: self.video.active,
            });
        }
        self.pending_start = None;

        if self.pending_stop {
            self.pending_stop = false;
            self.stop();
        }
    }

    fn on_stop(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            warn!(
                id = %self.config.id,
                code = ?ack.error,
                "Could not stop broadcast: {}",
                ack.message()
            );
            return;
        }
        if self.state != SessionState::Stopping {
            debug!(id = %self.config.id, state = %self.state.name(), "Ignoring stop ack");
            return;
        }

        info!(id = %self.config.id, "Broadcast stopped");
        self.connected = false;
        if let Some(negotiation) = self.negotiation.take() {
            self.device.release(negotiation.media);
        }
        self.send_command(Command::SetImage {
            value: self.config.image.clone(),
            display: true,
        });
        self.transition(SessionState::Stopped);
        self.publish(SessionEvent::Stopped {
            id: self.config.id.clone(),
        });
    }

    fn on_connect(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if ack.ok {
            info!(id = %self.config.id, "Connected to media server");
            self.connected = true;
            self.publish(SessionEvent::Connected {
                id: self.config.id.clone(),
            });
        } else {
            warn!(
                id = %self.config.id,
                code = ?ack.error,
                "Could not connect to media server: {}",
                ack.message()
            );
        }
    }

    fn on_authorize(&mut self, envelope: &Envelope) {
        let ok = envelope.ack().ok;
        info!(
            id = %self.config.id,
            "Camera/microphone access has been {}",
            if ok { "authorized" } else { "refused" }
        );
        self.authorized = ok;
        self.publish(SessionEvent::Authorized {
            id: self.config.id.clone(),
            ok,
        });
    }

    fn on_set_quality(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        let pending = self.pending_quality.take();
        if !ack.ok {
            self.pending_fps = None;
            self.reject_setting("quality", &ack);
            return;
        }

        let Some((kind, preset)) = pending else {
            debug!(id = %self.config.id, "Quality ack without a pending change");
            return;
        };

        match kind {
            MediaKind::Video => {
                self.video.quality = preset;
                self.publish(SessionEvent::SettingChanged {
                    id: self.config.id.clone(),
                    change: SettingChange::Quality { kind },
                });
                // Causal order: the framerate command goes out only now
                // that the quality command is confirmed.
                if let Some(fps) = self.pending_fps {
                    self.send_command(Command::SetFps { value: fps });
                }
            }
            MediaKind::Audio => {
                self.audio.quality = preset;
                self.publish(SessionEvent::SettingChanged {
                    id: self.config.id.clone(),
                    change: SettingChange::Quality { kind },
                });
            }
        }
    }

    fn on_set_fps(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        let pending = self.pending_fps.take();
        if !ack.ok {
            self.reject_setting("fps", &ack);
            return;
        }

        let value = envelope
            .u64_field("value")
            .ok()
            .map(|v| v as u32)
            .or(pending);
        if let Some(fps) = value {
            self.video.fps = fps;
            self.publish(SessionEvent::SettingChanged {
                id: self.config.id.clone(),
                change: SettingChange::Fps { value: fps },
            });
        }
    }

    fn on_set_key_frame_interval(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("key_frame_interval", &ack);
            return;
        }
        if let Ok(value) = envelope.u64_field("value") {
            let value = value as u32;
            self.video.key_frame_interval = value;
            self.publish(SessionEvent::SettingChanged {
                id: self.config.id.clone(),
                change: SettingChange::KeyFrameInterval { value },
            });
        }
    }

    fn on_set_ratio(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("ratio", &ack);
            return;
        }
        match envelope.str_field("value").map(str::parse::<Ratio>) {
            Ok(Ok(ratio)) => {
                self.video.ratio = ratio;
                self.publish(SessionEvent::SettingChanged {
                    id: self.config.id.clone(),
                    change: SettingChange::Ratio { value: ratio },
                });
            }
            _ => debug!(id = %self.config.id, "Ratio ack without a usable value"),
        }
    }

    fn on_set_capture_size(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("capture_size", &ack);
            return;
        }
        if let Ok(value) = envelope.u64_field("value") {
            self.video.capture_height = value as u32;
            self.publish(SessionEvent::SettingChanged {
                id: self.config.id.clone(),
                change: SettingChange::CaptureSize { value: value as u32 },
            });
        }
    }

    fn on_set_gain(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("gain", &ack);
            return;
        }
        if let Ok(value) = envelope.u64_field("value") {
            let value = value as u32;
            self.audio.gain = value;
            self.publish(SessionEvent::SettingChanged {
                id: self.config.id.clone(),
                change: SettingChange::Gain { value },
            });
        }
    }

    fn on_set_video_active(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("video_active", &ack);
            return;
        }
        if let Ok(active) = envelope.bool_field("value") {
            self.video.active = active;
            self.sync_placeholder();
            self.publish(SessionEvent::SettingChanged {
                id: self.config.id.clone(),
                change: SettingChange::VideoActive { value: active },
            });
        }
    }

    fn on_mute(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("mute", &ack);
            return;
        }
        self.audio.active = false;
        self.publish(SessionEvent::SettingChanged {
            id: self.config.id.clone(),
            change: SettingChange::Muted,
        });
    }

    fn on_unmute(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("unmute", &ack);
            return;
        }
        self.audio.active = true;
        self.publish(SessionEvent::SettingChanged {
            id: self.config.id.clone(),
            change: SettingChange::Unmuted,
        });
    }

    fn on_set_loopback(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if !ack.ok {
            self.reject_setting("loopback", &ack);
            return;
        }
        if let Ok(value) = envelope.bool_field("value") {
            self.audio.loopback = value;
            self.publish(SessionEvent::SettingChanged {
                id: self.config.id.clone(),
                change: SettingChange::Loopback { value },
            });
        }
    }

    fn on_mic_activity(&mut self, envelope: &Envelope) {
        let level = envelope.f64_field("level").unwrap_or(0.0);
        self.publish(SessionEvent::MicActivity {
            id: self.config.id.clone(),
            level,
        });
    }

    fn on_image(&mut self, envelope: &Envelope) {
        let ack = envelope.ack();
        if ack.ok {
            self.publish(SessionEvent::Image {
                id: self.config.id.clone(),
            });
        } else {
            warn!(
                id = %self.config.id,
                code = ?ack.error,
                "Could not update placeholder image: {}",
                ack.message()
            );
        }
    }

    fn on_answer(&mut self, envelope: &Envelope) {
        if envelope.str_field("session").unwrap_or("") != self.config.id {
            debug!(id = %self.config.id, "Answer for another session, ignoring");
            return;
        }
        let media = match &self.negotiation {
            Some(negotiation) if self.state == SessionState::Starting => {
                negotiation.media.clone()
            }
            _ => {
                debug!(id = %self.config.id, state = %self.state.name(), "Ignoring answer");
                return;
            }
        };

        let answer: SessionDescription = match envelope.typed_field("description") {
            Ok(answer) => answer,
            Err(e) => {
                warn!(id = %self.config.id, "Unusable answer payload: {}", e);
                return;
            }
        };
        match self.device.apply_answer(&media, &answer) {
            Ok(()) => {
                info!(id = %self.config.id, "Answer applied, media path established");
                let endpoint = self.endpoint.as_ref().map(|e| e.url.clone());
                let success = self.pending_start.take().and_then(|mut p| p.success.take());
                self.enter_started(endpoint, success);
            }
            Err(e) => {
                warn!(id = %self.config.id, "Applying answer failed: {}", e);
                if let Some(negotiation) = self.negotiation.take() {
                    self.device.release(negotiation.media);
                }
                self.transition(SessionState::Failed);
                self.publish(SessionEvent::Failed {
                    id: self.config.id.clone(),
                    code: None,
                    message: e.to_string(),
                });
                if let Some(mut pending) = self.pending_start.take() {
                    fire_error(&mut pending.error, None, e.to_string());
                }
            }
        }
    }

    fn on_candidate(&mut self, envelope: &Envelope) {
        let Some(negotiation) = &self.negotiation else {
            debug!(id = %self.config.id, "Candidate without an active negotiation");
            return;
        };
        let media = negotiation.media.clone();
        if let Ok(candidate) = envelope.str_field("candidate") {
            if let Err(e) = self.device.add_candidate(&media, candidate) {
                // Candidate trickling is best effort; losing one degrades
                // connectivity but is not a protocol error.
                debug!(id = %self.config.id, "Dropped candidate: {}", e);
            }
        }
    }

    fn reject_setting(&mut self, setting: &'static str, ack: &stagecast_protocol::Ack) {
        warn!(
            id = %self.config.id,
            setting,
            code = ?ack.error,
            "Setting change refused: {}",
            ack.message()
        );
        self.publish(SessionEvent::SettingRejected {
            id: self.config.id.clone(),
            setting: setting.to_string(),
            code: ack.error,
            message: ack.message(),
        });
    }

    /// Show the placeholder when the camera is off, hide it otherwise.
    fn sync_placeholder(&mut self) {
        if self.video.active {
            self.send_command(Command::HideImage);
        } else {
            self.send_command(Command::SetImage {
                value: self.config.image.clone(),
                display: true,
            });
        }
    }

    fn send_command(&mut self, command: Command) {
        self.next_message_id += 1;
        let id = format!("{}-{}", self.config.id, self.next_message_id);
        self.channel.send(command.into_envelope().with_id(id));
    }

    fn transition(&mut self, to: SessionState) {
        debug!(
            id = %self.config.id,
            previous = %self.state.name(),
            current = %to.name(),
            "State transition"
        );
        self.state = to;
    }

    fn publish(&self, event: SessionEvent) {
        self.bus.publish(Notification::Session(event));
    }
}

fn fire_error(
    callback: &mut Option<crate::config::StartErrorFn>,
    code: Option<i64>,
    message: String,
) {
    if let Some(callback) = callback.take() {
        callback(StartFailure { code, message });
    }
}
