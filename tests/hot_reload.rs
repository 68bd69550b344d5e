use glint::device::recording::{Call, RecordingDevice};
use glint::monitor::{ManualClock, PollingMonitor};
use glint::{GraphicsCapabilities, Shader, ShaderError, UniformValue};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

const VERT: &str = "void main() { gl_Position = vec4(0.0); }\n";
const FRAG: &str = "uniform float alpha;\nvoid main() {}\n";

struct Fixture {
    dir: PathBuf,
    clock: Rc<ManualClock>,
    device: Rc<RecordingDevice>,
}

impl Fixture {
    fn new(test: &str, descriptor: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("glint_hot_reload_{}_{}", test, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("plain.vert"), VERT).unwrap();
        fs::write(dir.join("plain.frag"), FRAG).unwrap();
        fs::write(dir.join("plain.shader"), descriptor).unwrap();
        Self {
            dir,
            clock: Rc::new(ManualClock::new()),
            device: Rc::new(RecordingDevice::new().with_uniforms(&["alpha"])),
        }
    }

    fn shader(&self) -> Shader<RecordingDevice> {
        let caps = GraphicsCapabilities::probe(&*self.device);
        let monitor = PollingMonitor::with_clock(Rc::clone(&self.clock), Duration::from_secs(1));
        Shader::from_file(Rc::clone(&self.device), caps, self.dir.join("plain.shader")).with_monitor(Box::new(monitor))
    }

    /// Rewrites a file and stamps it with a distinct modification time.
    fn edit(&self, name: &str, content: &str, secs: u64) {
        let path = self.dir.join(name);
        fs::write(&path, content).unwrap();
        stamp(&path, secs);
    }

    fn links(&self) -> usize {
        self.device.count(|c| matches!(c, Call::LinkProgram(_)))
    }

    fn deletes(&self) -> usize {
        self.device.count(|c| matches!(c, Call::DeleteProgram(_)))
    }
}

fn stamp(path: &Path, secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

#[test]
fn test_edit_triggers_exactly_one_reload() {
    let fixture = Fixture::new("single", "vert:plain.vert\nfrag:plain.frag\nunif:alpha=0.5\n");
    let mut shader = fixture.shader();
    shader.load().unwrap();
    shader.apply_shader().unwrap();
    assert_eq!((fixture.links(), fixture.deletes()), (1, 0));

    fixture.clock.advance(Duration::from_secs(2));
    shader.apply_shader().unwrap();
    assert_eq!(fixture.links(), 1);

    fixture.edit("plain.frag", "uniform float alpha;\nvoid main() { }\n", 10_000);
    fixture.clock.advance(Duration::from_secs(1));
    shader.apply_shader().unwrap();
    assert_eq!((fixture.links(), fixture.deletes()), (2, 1));

    // Baseline was rebuilt, so the same edit is not seen twice.
    fixture.clock.advance(Duration::from_secs(1));
    shader.apply_shader().unwrap();
    assert_eq!((fixture.links(), fixture.deletes()), (2, 1));
}

#[test]
fn test_reload_waits_for_interval() {
    let fixture = Fixture::new("interval", "vert:plain.vert\nfrag:plain.frag\n");
    let mut shader = fixture.shader();
    shader.load().unwrap();

    fixture.edit("plain.vert", VERT, 20_000);
    fixture.clock.advance(Duration::from_millis(400));
    shader.apply_shader().unwrap();
    assert_eq!(fixture.links(), 1);

    fixture.clock.advance(Duration::from_millis(600));
    shader.apply_shader().unwrap();
    assert_eq!(fixture.links(), 2);
}

#[test]
fn test_parameters_survive_reload() {
    let fixture = Fixture::new("params", "vert:plain.vert\nfrag:plain.frag\n");
    let mut shader = fixture.shader();
    shader.load().unwrap();
    shader.set_uniform("alpha", 0.25f32);
    shader.apply_shader().unwrap();

    fixture.edit("plain.frag", FRAG, 30_000);
    fixture.clock.advance(Duration::from_secs(1));
    fixture.device.clear_calls();
    shader.apply_shader().unwrap();

    assert_eq!(shader.uniform("alpha"), Some(UniformValue::Float(0.25)));
    let uploads = fixture.device.count(|c| matches!(c, Call::UploadUniform(_, UniformValue::Float(v)) if *v == 0.25));
    assert_eq!(uploads, 1);
}

#[test]
fn test_descriptor_edit_adds_uniform() {
    let fixture = Fixture::new("descriptor_edit", "vert:plain.vert\nfrag:plain.frag\n");
    let mut shader = fixture.shader();
    shader.load().unwrap();
    assert_eq!(shader.uniform("alpha"), None);

    fixture.edit("plain.shader", "vert:plain.vert\nfrag:plain.frag\nunif:alpha=0.75\n", 40_000);
    fixture.clock.advance(Duration::from_secs(1));
    shader.apply_shader().unwrap();
    assert_eq!(shader.uniform("alpha"), Some(UniformValue::Float(0.75)));
}

#[test]
fn test_broken_edit_recovers_after_fix() {
    let fixture = Fixture::new("recover", "vert:plain.vert\nfrag:plain.frag\n");
    let mut shader = fixture.shader();
    shader.load().unwrap();

    fixture.edit("plain.frag", "void main() {}\n#error half-saved\n", 50_000);
    fixture.clock.advance(Duration::from_secs(1));
    assert!(matches!(shader.apply_shader(), Err(ShaderError::Compile { .. })));
    assert!(!shader.is_loaded());
    assert!(matches!(shader.apply_shader(), Err(ShaderError::NotLoaded)));

    fixture.edit("plain.frag", FRAG, 50_100);
    fixture.clock.advance(Duration::from_secs(1));
    shader.apply_shader().unwrap();
    assert!(shader.is_loaded());
    assert_eq!(fixture.device.live_programs(), 1);
}

#[test]
fn test_malformed_descriptor_still_watched() {
    let fixture = Fixture::new("malformed", "vert:plain.vert\ntext:no-separator\n");
    let mut shader = fixture.shader();
    assert!(matches!(shader.load(), Err(ShaderError::MissingSeparator { line: 2, .. })));

    fixture.edit("plain.shader", "vert:plain.vert\nfrag:plain.frag\n", 60_000);
    fixture.clock.advance(Duration::from_secs(1));
    shader.apply_shader().unwrap();
    assert!(shader.is_loaded());
}

#[test]
fn test_creating_missing_stage_file_triggers_reload() {
    let fixture = Fixture::new("missing_stage", "vert:plain.vert\nfrag:later.frag\n");
    let mut shader = fixture.shader();
    assert!(matches!(shader.load(), Err(ShaderError::Io { .. })));
    assert_eq!(
        shader.descriptor().watched_files().last(),
        Some(&fixture.dir.join("later.frag"))
    );

    fixture.edit("later.frag", FRAG, 70_000);
    fixture.clock.advance(Duration::from_secs(1));
    shader.apply_shader().unwrap();
    assert!(shader.is_loaded());
}
