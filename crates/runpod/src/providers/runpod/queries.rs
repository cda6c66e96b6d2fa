//! GraphQL documents. All values travel as variables.

/// Connectivity check against the current user.
pub const PING: &str = "query Myself { myself { id } }";

/// Create an on-demand pod.
pub const CREATE_POD: &str = r"mutation PodFindAndDeployOnDemand($input: PodFindAndDeployOnDemandInput!) {
  podFindAndDeployOnDemand(input: $input) {
    id
    name
    imageName
    gpuCount
    volumeInGb
    containerDiskInGb
    desiredStatus
    ports
    volumeMountPath
    dockerArgs
    env
    machineId
    machine {
      podHostId
      gpuTypeId
    }
  }
}";

/// Fetch a pod with machine and runtime details.
pub const GET_POD: &str = r"query Pod($input: PodFilter!) {
  pod(input: $input) {
    id
    name
    imageName
    gpuCount
    volumeInGb
    containerDiskInGb
    desiredStatus
    ports
    volumeMountPath
    dockerArgs
    env
    machineId
    machine {
      podHostId
      gpuTypeId
    }
    runtime {
      uptimeInSeconds
      ports {
        ip
        isIpPublic
        privatePort
        publicPort
        type
      }
    }
  }
}";

/// Terminate a pod. Returns no payload.
pub const TERMINATE_POD: &str = r"mutation PodTerminate($input: PodTerminateInput!) {
  podTerminate(input: $input)
}";

/// Stop a running pod.
pub const STOP_POD: &str = r"mutation PodStop($input: PodStopInput!) {
  podStop(input: $input) {
    id
    desiredStatus
  }
}";

/// Resume a stopped pod.
pub const RESUME_POD: &str = r"mutation PodResume($input: PodResumeInput!) {
  podResume(input: $input) {
    id
    desiredStatus
    imageName
    machineId
    machine {
      podHostId
    }
  }
}";

/// List all GPU types.
pub const LIST_GPU_TYPES: &str = r"query GpuTypes {
  gpuTypes {
    id
    displayName
    memoryInGb
    secureCloud
    communityCloud
  }
}";

/// Fetch GPU types matching a filter.
pub const GET_GPU_TYPE: &str = r"query GpuType($input: GpuTypeFilter) {
  gpuTypes(input: $input) {
    id
    displayName
    memoryInGb
    secureCloud
    communityCloud
  }
}";
