//! Session orchestrator
//!
//! Owns the session, the auth gate, the stores and every external service.
//! Each input line is classified by the router, authorized, and handled
//! here; collaborator failures become error replies and never end the
//! session.

mod repl;
mod turn;

pub use repl::{run_repl, LineSource};
pub use turn::{Reply, Turn};

use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime};
use tracing::{debug, error, info, warn};

use crate::auth::{AuthGate, AuthPolicy};
use crate::backend::{create_backend, ConversationBackend};
use crate::biometric::{CommandSource, EmbeddingEngine};
use crate::calendar::{
    agenda_summary, format_agenda, format_free_busy, when, CalendarProvider, DisabledCalendar,
    GoogleCalendar, TimeWindow,
};
use crate::config::AssistantConfig;
use crate::error::{Error, Result};
use crate::intent::{self, Intent};
use crate::logging::AUDIT_TARGET;
use crate::nav::{self, MapProvider};
use crate::persona::{PersonaDefinition, PersonaRegistry};
use crate::router::{self, Classified, Command, Toggle};
use crate::session::{Session, GUEST_NAME};
use crate::speech::{
    truncate_for_speech, CommandStt, CommandTts, SpeechToText, TextToSpeech, VoicePrefs,
};
use crate::store::{identity_key, PlaceEntry, PlaceStore, PreferencesStore, ProfileStore};

// ─────────────────────────────────────────────────────────────────
// External Services
// ─────────────────────────────────────────────────────────────────

/// Collaborators reached through narrow interfaces.
pub struct Services {
    pub backend: Box<dyn ConversationBackend>,
    pub calendar: Box<dyn CalendarProvider>,
    pub stt: Box<dyn SpeechToText>,
    pub tts: Box<dyn TextToSpeech>,
}

impl Services {
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let calendar: Box<dyn CalendarProvider> = if config.calendar.enabled {
            Box::new(GoogleCalendar::new(&config.calendar, config.calendar_dir())?)
        } else {
            Box::new(DisabledCalendar)
        };

        Ok(Self {
            backend: create_backend(&config.llm)?,
            calendar,
            stt: Box::new(CommandStt::new(&config.voice)),
            tts: Box::new(CommandTts::new(&config.voice)),
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────

pub struct SessionOrchestrator {
    config: AssistantConfig,
    personas: PersonaRegistry,
    auth: AuthGate,
    profiles: ProfileStore,
    preferences: PreferencesStore,
    /// Places of the unlocked identity, opened on first use
    places: Option<PlaceStore>,
    services: Services,
    session: Session,
}

impl SessionOrchestrator {
    pub fn new(
        config: AssistantConfig,
        personas: PersonaRegistry,
        auth: AuthGate,
        profiles: ProfileStore,
        preferences: PreferencesStore,
        services: Services,
    ) -> Result<Self> {
        personas.resolve(&config.assistant.default_persona)?;
        let guest = personas.resolve(&config.assistant.guest_persona)?;
        if guest.requires_unlock {
            return Err(Error::config_field_invalid(
                "assistant.guest_persona",
                format!("persona '{}' requires an unlocked session", guest.id),
            ));
        }
        let session = Session::new(&config, guest);
        info!(session = %session.id, "Session created");

        Ok(Self {
            config,
            personas,
            auth,
            profiles,
            preferences,
            places: None,
            services,
            session,
        })
    }

    /// Open stores under the data directory and wire the configured services.
    ///
    /// Fails on unreadable or corrupt stores and invalid persona files.
    pub fn from_config(config: AssistantConfig, services: Services) -> Result<Self> {
        let personas = PersonaRegistry::load(&config.personas_dir())?;
        let profiles = ProfileStore::open(config.profiles_path(), config.templates_dir())?;
        let preferences = PreferencesStore::open(config.preferences_path())?;

        let source = CommandSource::new(
            config.auth.capture_command.as_deref(),
            config.camera_index(),
            config.camera.prefer_external,
        );
        let engine = EmbeddingEngine::new(Box::new(source));
        let auth = AuthGate::new(Box::new(engine), AuthPolicy::from(&config.auth));

        Self::new(config, personas, auth, profiles, preferences, services)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn persona(&self) -> Result<&PersonaDefinition> {
        self.personas.resolve(&self.session.active_persona)
    }

    /// Name the assistant addresses: the identity, or "guest".
    fn user_name(&self) -> String {
        self.auth.identity().unwrap_or(GUEST_NAME).to_string()
    }

    // ─────────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────────

    /// Banner, optional face auto-recognition, and the first greeting.
    pub fn start(&mut self) -> Turn {
        let mut turn = Turn::default();
        turn.info(format!(
            "{} ready. Type /help for commands, /exit to quit.",
            self.config.assistant.name
        ));

        let try_face = self.config.auth.face_autorecognize
            && (!self.auth.policy().strict || !self.profiles.is_empty());
        if try_face {
            if let Err(error) = self.recognize(&mut turn) {
                debug!(error = %error.format_for_log(), "Auto-recognition failed");
                turn.warn(format!(
                    "({}; continuing as guest. Use /recognize to try again.)",
                    error
                ));
            }
        }

        if !self.auth.is_unlocked() {
            match self.persona() {
                Ok(persona) => {
                    let greeting = persona.greeting_for(GUEST_NAME);
                    turn.assistant(persona.display_name.clone(), greeting);
                }
                Err(error) => turn.fail(&error),
            }
        }
        turn
    }

    // ─────────────────────────────────────────────────────────────
    // Input Handling
    // ─────────────────────────────────────────────────────────────

    /// Handle one typed line.
    pub async fn handle_line(&mut self, line: &str) -> Turn {
        let mut turn = Turn::default();
        if let Err(error) = self.dispatch(line, &mut turn).await {
            let category = error.category();
            if error.is_fatal() {
                error!(%category, error = %error.format_for_log(), "Turn failed");
            } else {
                debug!(%category, error = %error.format_for_log(), "Turn failed");
            }
            turn.fail(&error);
        }
        turn
    }

    /// Handle one transcribed phrase. Exit phrases pause voice mode.
    pub async fn handle_voice(&mut self, text: &str) -> Turn {
        if self.is_exit_phrase(text) {
            self.session.voice_mode = false;
            let mut turn = Turn::default();
            turn.info("(Voice mode paused. Type /voice on to resume.)");
            return turn;
        }
        self.handle_line(text).await
    }

    /// Record one phrase from the microphone.
    pub fn transcribe(&mut self) -> Result<String> {
        self.services.stt.transcribe()
    }

    /// Leave voice mode after a transcriber failure.
    pub fn pause_voice(&mut self) {
        self.session.voice_mode = false;
    }

    /// Speak the turn's speech text if TTS is on. Failures are only logged.
    pub fn speak(&self, turn: &Turn) {
        let Some(ref text) = turn.speech else {
            return;
        };
        if !self.session.tts_enabled || !self.services.tts.is_available() {
            return;
        }
        if let Err(error) = self.services.tts.speak(text, &self.session.voice) {
            warn!(error = %error, "Speech output failed");
        }
    }

    fn is_exit_phrase(&self, text: &str) -> bool {
        let phrase = text
            .trim()
            .trim_matches(|c: char| c.is_ascii_punctuation())
            .to_lowercase();
        self.config
            .voice
            .exit_phrases
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&phrase))
    }

    async fn dispatch(&mut self, line: &str, turn: &mut Turn) -> Result<()> {
        match router::classify(line)? {
            Classified::Blank => Ok(()),
            Classified::Command(command) => {
                router::authorize(&command, self.auth.is_unlocked(), self.persona()?)?;
                debug!(command = command.name(), "Dispatching command");
                self.execute(command, turn).await
            }
            Classified::Utterance(text) => self.converse(&text, turn).await,
        }
    }

    async fn execute(&mut self, command: Command, turn: &mut Turn) -> Result<()> {
        match command {
            Command::Help => {
                turn.info(router::help_text(self.auth.is_unlocked(), self.persona()?));
            }
            Command::Exit => {
                turn.info("Goodbye.");
                turn.exit = true;
            }
            Command::Status => turn.info(self.status_text()?),
            Command::Recognize => self.recognize(turn)?,
            Command::SetupProfile { name } => self.setup_profile(&name, turn)?,
            Command::Login { name } => {
                let identity = self.auth.bypass(&name, &self.profiles)?.to_string();
                self.on_unlocked(identity, turn)?;
            }
            Command::Lock => {
                self.lock()?;
                turn.info("Session locked.");
            }
            Command::Switch { persona } => self.switch(persona.as_deref(), turn)?,
            Command::Agenda { day } => {
                let today = Local::now().date_naive();
                let day = match day {
                    Some(ref text) => when::parse_day(text, today).ok_or_else(|| {
                        Error::invalid_arguments("agenda", "/agenda [today|tomorrow|<weekday>]")
                    })?,
                    None => today,
                };
                self.require_calendar()?;
                self.agenda(day, turn).await?;
            }
            Command::Nav { place } => {
                let entry = self.places()?.lookup(&place)?.clone();
                self.directions(&entry, turn);
            }
            Command::SetPlace { key, address } => {
                let entry = self.places()?.set(&key, &address)?;
                turn.info(format!("(Saved place '{}'.)", entry.key));
            }
            Command::Places => {
                let places = self.places()?;
                if places.is_empty() {
                    turn.info("(No saved places.)");
                } else {
                    let lines: Vec<String> = places
                        .iter()
                        .map(|p| format!("- {}: {}", p.key, p.address))
                        .collect();
                    turn.info(lines.join("\n"));
                }
            }
            Command::Voice(toggle) => self.voice(toggle, turn)?,
            Command::Tts(toggle) => self.tts(toggle, turn)?,
            Command::Voices => {
                let voices = self.services.tts.list_voices()?;
                if voices.is_empty() {
                    turn.info("(No voices available.)");
                } else {
                    let current = self.session.voice.voice_index;
                    let lines: Vec<String> = voices
                        .iter()
                        .enumerate()
                        .map(|(i, v)| {
                            let marker = if current == Some(i) { '*' } else { ' ' };
                            format!("{}[{}] {}", marker, i, v.label)
                        })
                        .collect();
                    turn.info(lines.join("\n"));
                }
            }
            Command::VoiceIndex { index } => {
                let voices = self.services.tts.list_voices()?;
                let voice = voices.get(index).ok_or_else(|| {
                    Error::speech(format!("No voice #{} ({} available)", index, voices.len()))
                })?;
                self.session.voice.voice_index = Some(index);
                self.save_preference(|p| p.voice_index = Some(index))?;
                turn.info(format!("(Voice set to [{}] {}.)", index, voice.label));
            }
            Command::Rate { words_per_minute } => {
                self.session.voice.rate = words_per_minute;
                self.save_preference(|p| p.rate = Some(words_per_minute))?;
                turn.info(format!("(Speaking rate set to {} wpm.)", words_per_minute));
            }
            Command::Mic => {
                if !self.services.stt.is_available() {
                    return Err(Error::speech(
                        "No speech recognizer is configured (voice.stt_command)",
                    ));
                }
                let text = self.services.stt.transcribe()?;
                turn.info(format!("You said: {}", text));
                self.converse(&text, turn).await?;
            }
            Command::Model { name } => match name {
                Some(name) => {
                    info!(model = %name, "Model selected");
                    self.session.selected_model = name;
                    turn.info(format!("(Model set to {}.)", self.session.selected_model));
                }
                None => turn.info(format!("Model: {}", self.session.selected_model)),
            },
            Command::Clear => {
                self.session.conversation.clear();
                turn.info("(Conversation cleared.)");
            }
            Command::GrantCalendar { name } => self.set_calendar_access(&name, true, turn)?,
            Command::RevokeCalendar { name } => self.set_calendar_access(&name, false, turn)?,
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────

    fn recognize(&mut self, turn: &mut Turn) -> Result<()> {
        let fallback = self.preferences.last_identity();
        let identity = self.auth.attempt_unlock(&self.profiles, fallback)?.to_string();
        self.on_unlocked(identity, turn)
    }

    fn setup_profile(&mut self, name: &str, turn: &mut Turn) -> Result<()> {
        // Replacing someone's face requires being that someone.
        if let Some(existing) = self.profiles.get(name) {
            let is_owner = self
                .auth
                .identity()
                .is_some_and(|id| id.eq_ignore_ascii_case(&existing.name));
            if !is_owner {
                return Err(Error::NotPermitted {
                    message: format!("only {} can re-enroll their profile", existing.name),
                });
            }
        }

        let entry = self.auth.enroll(name, &mut self.profiles)?;
        turn.info(format!(
            "(Enrolled {} from {} samples. Use /recognize to unlock.)",
            entry.name, entry.sample_count
        ));
        Ok(())
    }

    /// Apply the identity's preferences and persona after any unlock.
    fn on_unlocked(&mut self, identity: String, turn: &mut Turn) -> Result<()> {
        let prefs = self.preferences.get(&identity);
        self.places = None;
        self.session.tts_enabled = prefs
            .tts_enabled
            .unwrap_or(self.config.voice.tts_enabled_default);
        self.session.voice = VoicePrefs {
            voice_index: prefs.voice_index,
            rate: prefs.rate.unwrap_or(self.config.voice.default_rate),
        };
        self.session.voice_mode =
            self.config.voice.voice_mode_default && self.services.stt.is_available();

        let persona = [
            prefs.persona.clone(),
            Some(identity_key(&identity)),
            Some(self.config.assistant.default_persona.clone()),
        ]
        .into_iter()
        .flatten()
        .find_map(|id| self.personas.get(&id).filter(|p| p.id != self.config.assistant.guest_persona))
        .unwrap_or(self.personas.resolve(&self.config.assistant.default_persona)?)
        .clone();
        self.session
            .activate_persona(&persona, &identity, self.config.assistant.history_turns);

        turn.info(format!("Unlocked as {}.", identity));
        turn.assistant(persona.display_name.clone(), persona.greeting_for(&identity));
        if self.session.voice_mode {
            turn.info("(Voice mode on. Say \"pause\" to type instead.)");
        }

        if let Err(error) = self.preferences.set_last_identity(&identity) {
            warn!(error = %error.format_for_log(), "Could not record last identity");
        }
        Ok(())
    }

    fn lock(&mut self) -> Result<()> {
        self.auth.lock();
        self.places = None;
        self.session.voice_mode = false;
        self.session.tts_enabled = self.config.voice.tts_enabled_default;
        self.session.voice = VoicePrefs {
            voice_index: None,
            rate: self.config.voice.default_rate,
        };
        let guest = self.personas.resolve(&self.config.assistant.guest_persona)?;
        self.session
            .activate_persona(guest, GUEST_NAME, self.config.assistant.history_turns);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Personas and Modes
    // ─────────────────────────────────────────────────────────────

    fn switch(&mut self, requested: Option<&str>, turn: &mut Turn) -> Result<()> {
        let unlocked = self.auth.is_unlocked();
        let target = match requested {
            Some(id) => self.personas.resolve(id)?,
            None => self
                .personas
                .next_after(&self.session.active_persona, unlocked)
                .ok_or_else(|| Error::NotPermitted {
                    message: "no other persona is available while locked".to_string(),
                })?,
        }
        .clone();

        if target.requires_unlock && !unlocked {
            return Err(Error::locked(format!("The {} persona", target.display_name)));
        }

        let name = self.user_name();
        self.session
            .activate_persona(&target, &name, self.config.assistant.history_turns);
        if unlocked {
            let id = target.id.clone();
            self.save_preference(move |p| p.persona = Some(id))?;
        }

        turn.info(format!("(Switched to {}.)", target.display_name));
        turn.assistant(target.display_name.clone(), target.greeting_for(&name));
        Ok(())
    }

    fn voice(&mut self, toggle: Toggle, turn: &mut Turn) -> Result<()> {
        match toggle {
            Toggle::On => {
                if !self.services.stt.is_available() {
                    return Err(Error::speech(
                        "No speech recognizer is available (set voice.stt_command)",
                    ));
                }
                self.session.voice_mode = true;
            }
            Toggle::Off => self.session.voice_mode = false,
            Toggle::Status => {}
        }
        turn.info(format!(
            "Voice mode is {}.",
            if self.session.voice_mode { "on" } else { "off" }
        ));
        Ok(())
    }

    fn tts(&mut self, toggle: Toggle, turn: &mut Turn) -> Result<()> {
        let enabled = match toggle {
            Toggle::On => {
                if !self.services.tts.is_available() {
                    return Err(Error::speech(
                        "No speech synthesizer found (install say/espeak or set voice.tts_command)",
                    ));
                }
                Some(true)
            }
            Toggle::Off => Some(false),
            Toggle::Status => None,
        };
        if let Some(enabled) = enabled {
            self.session.tts_enabled = enabled;
            self.save_preference(|p| p.tts_enabled = Some(enabled))?;
        }
        turn.info(format!(
            "Spoken replies are {}.",
            if self.session.tts_enabled { "on" } else { "off" }
        ));
        Ok(())
    }

    /// Persist a preference for the unlocked identity; no-op while locked.
    fn save_preference<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut crate::store::IdentityPreferences),
    {
        match self.auth.identity() {
            Some(identity) => self.preferences.update(identity, change),
            None => Ok(()),
        }
    }

    fn status_text(&self) -> Result<String> {
        let persona = self.persona()?;
        let on_off = |b: bool| if b { "on" } else { "off" };
        let lock = match self.auth.state() {
            crate::auth::LockState::Locked => "locked".to_string(),
            crate::auth::LockState::Unlocked { identity, source } => {
                format!("unlocked as {} ({})", identity, source)
            }
        };

        Ok([
            format!("Session:      {}", lock),
            format!(
                "Started:      {}",
                self.session.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
            format!("Persona:      {} ({})", persona.display_name, persona.id),
            format!(
                "Model:        {} via {}",
                self.session.selected_model,
                self.services.backend.name()
            ),
            format!("Voice mode:   {}", on_off(self.session.voice_mode)),
            format!(
                "Spoken:       {} (rate {})",
                on_off(self.session.tts_enabled),
                self.session.voice.rate
            ),
            format!("Conversation: {} turns", self.session.conversation.turn_count()),
            format!("Profiles:     {} enrolled", self.profiles.len()),
            format!("Version:      {}", crate::version::build_info().short_version()),
        ]
        .join("\n"))
    }

    // ─────────────────────────────────────────────────────────────
    // Places and Navigation
    // ─────────────────────────────────────────────────────────────

    /// The unlocked identity's place store.
    fn places(&mut self) -> Result<&mut PlaceStore> {
        let identity = self
            .auth
            .identity()
            .ok_or_else(|| Error::locked("Saved places"))?
            .to_string();
        if self.places.is_none() {
            self.places = Some(PlaceStore::open(&self.config.places_dir(), &identity)?);
        }
        self.places
            .as_mut()
            .ok_or_else(|| Error::Internal("place store not open".to_string()))
    }

    fn directions(&self, entry: &PlaceEntry, turn: &mut Turn) {
        let provider = MapProvider::from_setting(&self.config.navigation.provider);
        let url = match nav::directions_url(&entry.address, provider) {
            Ok(url) => url,
            Err(error) => return turn.fail(&error),
        };

        turn.info(format!(
            "Directions to '{}' → {}\nURL: {}",
            entry.key, entry.address, url
        ));
        turn.speech = Some(format!("Opening directions to {}.", entry.key));

        if self.config.navigation.open_browser {
            if let Err(error) = nav::open_in_browser(&url) {
                turn.warn(format!("(Could not open {}: {})", provider, error));
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Calendar
    // ─────────────────────────────────────────────────────────────

    fn calendar_allowed(&self) -> bool {
        let Some(identity) = self.auth.identity() else {
            return false;
        };
        self.config.calendar.enabled
            && self
                .preferences
                .get(identity)
                .calendar_access
                .unwrap_or(self.config.calendar.default_access)
    }

    /// Why a calendar intent cannot be answered, if it cannot.
    fn calendar_refusal(&self) -> Option<String> {
        if self.calendar_allowed() {
            return None;
        }
        Some(match self.auth.identity() {
            None => "(Calendar is locked. Use /recognize to unlock.)".to_string(),
            Some(_) if !self.config.calendar.enabled => {
                "(Calendar is turned off in the configuration.)".to_string()
            }
            Some(identity) => format!(
                "(No calendar access for {}. Ask the owner to run /grant_calendar {}.)",
                identity, identity
            ),
        })
    }

    fn require_calendar(&self) -> Result<()> {
        if self.calendar_allowed() {
            return Ok(());
        }
        Err(Error::NotPermitted {
            message: format!("calendar access is not enabled for {}", self.user_name()),
        })
    }

    async fn agenda(&self, day: NaiveDate, turn: &mut Turn) -> Result<()> {
        let identity = self.user_name();
        let window = TimeWindow::day(day);
        let events = self
            .services
            .calendar
            .list_events(&identity, &window, self.config.calendar.max_events)
            .await?;

        turn.info(format_agenda(day, &events));
        turn.speech = Some(agenda_summary(day, events.len()));
        Ok(())
    }

    async fn free_busy(
        &self,
        day: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        turn: &mut Turn,
    ) -> Result<()> {
        let identity = self.user_name();
        let window = TimeWindow::between(day, start, end);
        let events = self
            .services
            .calendar
            .list_events(&identity, &window, self.config.calendar.max_events)
            .await?;

        let (text, spoken) = format_free_busy(&window, &events);
        turn.info(text);
        turn.speech = Some(spoken);
        Ok(())
    }

    fn set_calendar_access(&mut self, name: &str, allowed: bool, turn: &mut Turn) -> Result<()> {
        if let Some(ref owner) = self.config.auth.owner {
            let is_owner = self
                .auth
                .identity()
                .is_some_and(|id| id.eq_ignore_ascii_case(owner));
            if !is_owner {
                return Err(Error::NotPermitted {
                    message: format!("only {} can change calendar access", owner),
                });
            }
        }

        let target = self
            .profiles
            .get(name)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| name.trim().to_string());
        self.preferences
            .update(&target, |p| p.calendar_access = Some(allowed))?;
        info!(target: AUDIT_TARGET, identity = %target, allowed, "Calendar access changed");

        turn.info(format!(
            "(Calendar access {} for {}.)",
            if allowed { "granted" } else { "revoked" },
            target
        ));
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Conversation
    // ─────────────────────────────────────────────────────────────

    async fn converse(&mut self, text: &str, turn: &mut Turn) -> Result<()> {
        let unlocked = self.auth.is_unlocked();
        if !unlocked && self.config.assistant.require_unlock_for_chat {
            return Err(Error::locked("Chatting"));
        }

        let today = Local::now().date_naive();
        match intent::detect(text, today) {
            Some(Intent::Navigate { place }) => {
                if !unlocked {
                    turn.info("(Navigation is locked. Use /recognize to unlock.)");
                    return Ok(());
                }
                let entry = self.places()?.get(&place).cloned();
                match entry {
                    Some(entry) => self.directions(&entry, turn),
                    None => turn.info(format!(
                        "(I don't have '{}' saved. Use /setplace {} = <address or lat,lon>.)",
                        place, place
                    )),
                }
                return Ok(());
            }
            Some(Intent::Agenda { day }) => {
                if let Some(refusal) = self.calendar_refusal() {
                    turn.info(refusal);
                    return Ok(());
                }
                return self.agenda(day, turn).await;
            }
            Some(Intent::FreeBusy { day, start, end }) => {
                if let Some(refusal) = self.calendar_refusal() {
                    turn.info(refusal);
                    return Ok(());
                }
                return self.free_busy(day, start, end, turn).await;
            }
            None => {}
        }

        self.ask_backend(text, turn).await
    }

    /// Send the utterance with persona seed and history. History grows only
    /// when the backend answers in time.
    async fn ask_backend(&mut self, text: &str, turn: &mut Turn) -> Result<()> {
        let messages = self.session.conversation.request(text);
        let timeout_secs = self.config.llm.timeout_secs;

        let reply = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.services
                .backend
                .generate(&messages, &self.session.selected_model),
        )
        .await
        .map_err(|_| Error::Timeout {
            operation: "Language model request".to_string(),
            timeout_secs,
        })??;

        self.session.conversation.record(text, &reply);
        let persona = self.persona()?.display_name.clone();
        if self.session.tts_enabled {
            turn.speech = Some(truncate_for_speech(
                &reply,
                self.config.assistant.speak_limit_chars,
            ));
        }
        turn.assistant(persona, reply);
        Ok(())
    }
}
