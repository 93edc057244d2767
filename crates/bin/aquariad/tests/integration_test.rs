//! End-to-end tests for the full aquariad stack.
//!
//! Each test writes a config and schedule backed by small shell helpers,
//! loads them with the config-file adapter, runs the real scheduler and
//! process adapters behind the TCP server on `127.0.0.1:0`, and talks to it
//! through the protocol client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use aquaria_adapter_config_file::LoadOptions;
use aquaria_adapter_json_tcp::response::DeviceView;
use aquaria_adapter_json_tcp::{Client, ClientError, Server};
use aquaria_adapter_process::{ProcessAcquirer, ProcessActuator};
use aquaria_adapter_vcd::VcdLog;
use aquaria_app::scheduler::Scheduler;
use aquaria_domain::device::DeviceState;
use aquaria_domain::registry::Registry;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A scratch data directory, removed on drop.
struct Tank {
    dir: PathBuf,
}

impl Tank {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("aquariad-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write an `sh` script and return the helper command line running it.
    fn helper(&self, name: &str, body: &str) -> String {
        let path = self.write(name, &format!("{body}\n"));
        format!("/bin/sh {}", path.display())
    }

    /// A device helper appending its arguments to `<name>.log`.
    fn relay(&self, name: &str) -> String {
        let log = self.path(&format!("{name}.log"));
        self.helper(name, &format!("echo \"$@\" >> {}", log.display()))
    }

    fn actuations(&self, name: &str) -> Vec<String> {
        std::fs::read_to_string(self.path(&format!("{name}.log")))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn load(&self, config: &str, schedule: &str) -> Registry {
        let config = self.write("config", config);
        let schedule = self.write("schedule", schedule);
        aquaria_adapter_config_file::load(&config, &schedule, LoadOptions::default()).unwrap()
    }
}

impl Drop for Tank {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

struct Running {
    client: Client,
    stop: oneshot::Sender<()>,
    done: JoinHandle<std::io::Result<Registry>>,
}

impl Running {
    async fn stop(self) -> Registry {
        drop(self.client);
        let _ = self.stop.send(());
        self.done.await.unwrap().unwrap()
    }
}

async fn start(registry: Registry, vcd_log: Option<&Path>) -> Running {
    let log = vcd_log.map(|path| VcdLog::create(path).unwrap());
    let scheduler = Scheduler::new(ProcessAcquirer::new(), ProcessActuator::new(), log);
    let server = Server::bind("127.0.0.1:0", registry, scheduler).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let done = tokio::spawn(server.serve(async {
        let _ = stopped.await;
    }));
    let client = Client::connect(addr).await.unwrap();
    Running { client, stop, done }
}

/// Poll `name` until `check` holds, for at most ten seconds.
async fn wait_for_device(
    client: &mut Client,
    name: &str,
    check: impl Fn(&DeviceView) -> bool,
) -> DeviceView {
    for _ in 0..100 {
        let devices = client.devices(Some(name)).await.unwrap();
        if let Some(device) = devices.into_iter().find(|d| check(d)) {
            return device;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{name} never reached the expected state");
}

const HEATER_SCHEDULE: &str = "
device Heater
    on  Temp < 24.5C
    off Temp >= 25.5C
";

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_switch_heater_on_when_water_is_cold() {
    let tank = Tank::new("heater");
    // 16.85 C
    let probe = tank.helper("probe", "echo 290000000");
    let relay = tank.relay("relay");
    let registry = tank.load(
        &format!("sensor Temp temp {probe}\ndevice Heater {relay} -p 3\n"),
        HEATER_SCHEDULE,
    );
    let mut running = start(registry, None).await;

    let heater = wait_for_device(&mut running.client, "Heater", |d| d.active == Some(true)).await;
    assert_eq!(heater.reason, None);

    let sensors = running.client.sensors(Some("Temp")).await.unwrap();
    let reading = sensors[0].reading.as_ref().unwrap();
    assert_eq!(reading.value, 290_000_000);
    assert_eq!(reading.units, "uK");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(tank.actuations("relay"), ["-p 3 --state=on"]);

    running.stop().await;
}

#[tokio::test]
async fn should_keep_reading_absent_when_helper_fails() {
    let tank = Tank::new("failing");
    let probe = tank.helper("probe", "echo 'no probe' >&2\nexit 1");
    let relay = tank.relay("relay");
    let registry = tank.load(
        &format!("sensor Temp temp {probe}\ndevice Heater {relay}\n"),
        HEATER_SCHEDULE,
    );
    let mut running = start(registry, None).await;

    tokio::time::sleep(Duration::from_millis(3500)).await;

    let sensors = running.client.sensors(Some("Temp")).await.unwrap();
    assert_eq!(sensors[0].reading, None);
    let devices = running.client.devices(Some("Heater")).await.unwrap();
    assert_eq!(devices[0].active, None);
    assert!(tank.actuations("relay").is_empty());

    running.stop().await;
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_apply_override_until_it_expires() {
    let tank = Tank::new("override");
    let relay = tank.relay("lamp");
    let registry = tank.load(&format!("device Light {relay}\n"), "");
    let mut running = start(registry, None).await;

    let devices = running
        .client
        .set_device("light", DeviceState::On, Duration::from_secs(2))
        .await
        .unwrap();
    let reason = devices[0].reason.as_ref().unwrap();
    assert!(reason.active);
    assert!(reason.expires.value <= 2_000_000);

    let light = wait_for_device(&mut running.client, "Light", |d| d.active == Some(true)).await;
    assert!(light.reason.is_some());

    let light = wait_for_device(&mut running.client, "Light", |d| d.reason.is_none()).await;
    assert_eq!(light.active, Some(true));
    assert_eq!(tank.actuations("lamp"), ["--state=on"]);

    running.stop().await;
}

#[tokio::test]
async fn should_count_override_expiry_down_between_requests() {
    let tank = Tank::new("countdown");
    let relay = tank.relay("pump");
    let registry = tank.load(&format!("device Pump {relay}\n"), "");
    let mut running = start(registry, None).await;

    running
        .client
        .set_device("Pump", DeviceState::Off, Duration::from_secs(10))
        .await
        .unwrap();
    let remaining = |devices: Vec<DeviceView>| devices[0].reason.as_ref().unwrap().expires.value;

    let first = remaining(running.client.devices(Some("Pump")).await.unwrap());
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = remaining(running.client.devices(Some("Pump")).await.unwrap());

    assert!(second < first, "{second} is not below {first}");
    assert!(first - second >= 1_000_000);
    running.stop().await;
}

#[tokio::test]
async fn should_reject_override_for_unknown_device() {
    let tank = Tank::new("unknown");
    let registry = tank.load("", "");
    let mut running = start(registry, None).await;

    let result = running
        .client
        .set_device("Pump", DeviceState::On, Duration::from_secs(5))
        .await;

    assert!(matches!(result, Err(ClientError::Rejected)));
    running.stop().await;
}

// ---------------------------------------------------------------------------
// Waveform log
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_write_vcd_log_while_serving() {
    let tank = Tank::new("vcd");
    let probe = tank.helper("probe", "echo 290000000");
    let relay = tank.relay("relay");
    let registry = tank.load(
        &format!("sensor Temp temp {probe}\ndevice Heater {relay}\n"),
        HEATER_SCHEDULE,
    );
    let vcd = tank.path("aquaria.vcd");
    let mut running = start(registry, Some(&vcd)).await;

    wait_for_device(&mut running.client, "Heater", |d| d.active == Some(true)).await;
    running.stop().await;

    let text = std::fs::read_to_string(&vcd).unwrap();
    assert!(text.contains("$var real 64 1 Sensor.Temp $end"));
    assert!(text.contains("$var wire 1 2 Device.Heater $end"));
    assert!(text.contains("r290000000 1"));
    assert!(text.contains("b1 2"));
}
